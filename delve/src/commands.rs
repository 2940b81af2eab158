use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("delve")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("delve")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log every discovery (same as RUST_LOG=debug)")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl one or more seed URLs, promoting every discovered directory to a new \
                crawl root. Writes a detailed report and a flat URL list.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A single seed URL to crawl")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of seed URLs (default: ./urls.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory for results.txt and urls_only.txt")
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Detailed report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-m --"max-pages" <NUM>)
                        .required(false)
                        .help("Page budget per crawl root")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"settle" <SECONDS>)
                        .required(false)
                        .help("Seconds to wait after each page loads before extracting links")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page load timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("20"),
                )
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header sent with every request"),
                )
                .arg(
                    arg!(-b --"browser")
                        .required(false)
                        .help("Render pages in headless Chromium so script-generated links are seen")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Disable the progress spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
