use commands::command_argument_builder;
use delve::handlers;
use delve_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    handlers::init_tracing(verbose);

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handlers::handle_crawl(primary_command, quiet).await,
        Some((other, _)) => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(2);
        }
        // No subcommand provided, just show the banner
        None => {}
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
