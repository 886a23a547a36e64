use blogport::convert::{convert, Config};
use clap::{App, Arg};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = App::new("blogport")
        .about("Converts a Blogger export feed into static-site content files")
        .arg(
            Arg::with_name("export")
                .help("Path of the Blogger export file")
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .help("Directory for the rendered content files")
                .required(true),
        )
        .arg(
            Arg::with_name("extra")
                .long("extra")
                .takes_value(true)
                .help("Additional metadata to set in frontmatter"),
        )
        .get_matches();

    let config = Config {
        input: PathBuf::from(matches.value_of("export").unwrap()),
        output_directory: PathBuf::from(matches.value_of("output").unwrap()),
        extra: matches.value_of("extra").map(str::to_owned),
    };

    match convert(&config) {
        Ok(summary) => {
            println!("Wrote {} published posts to disk.", summary.published);
            println!("Wrote {} drafts to disk.", summary.drafts);
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}
