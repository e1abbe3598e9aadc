extern crate chrono;
extern crate env_logger;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate structopt;
extern crate tb_analysis;

use itertools::Itertools;
use std::env;
use std::io::Write;
use std::process;
use structopt::StructOpt;
use tb_analysis::*;

pub fn main() {
    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        let t = chrono::Local::now();
        writeln!(
            buf,
            "{} {:5} {}",
            t.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();

    let opts = Options::from_args();
    let result = match opts.setting {
        Some(ref path) => Setting::init(path),
        None => Ok(Setting::default()),
    }.and_then(|setting| pipeline::run(&opts, &setting));

    match result {
        Ok(report) => {
            for file in &report.files {
                info!("wrote {}", file.display());
            }
            info!("{} files in {}", report.files.len(), report.output_dir.display());
        }
        Err(e) => {
            error!("{}", e.iter().join(": "));
            process::exit(1);
        }
    }
}
