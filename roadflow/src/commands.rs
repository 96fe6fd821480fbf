use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use std::path::PathBuf;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("roadflow")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("roadflow")
        .about("Explore annual average daily traffic flows by local authority")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, spinners and warnings")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "More log output (-vv for trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("Config file (default: ~/.config/roadflow/config.toml)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            arg!(--"base-url" <URL>)
                .required(false)
                .help("Override the traffic API base URL")
                .value_parser(clap::value_parser!(Url))
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("authorities")
                .about("List the local authorities the API knows about")
                .arg(
                    arg!(--"filter" <TEXT>)
                        .required(false)
                        .help("Only show authorities whose id or name contains TEXT"),
                )
                .arg(format_arg()),
        )
        .subcommand(
            command!("flows")
                .about("Fetch annual average daily flows for one authority and year")
                .arg(
                    arg!(-a --"authority" <ID>)
                        .required(true)
                        .help("Local authority id, as listed by `roadflow authorities`"),
                )
                .arg(
                    arg!(-y --"year" <YEAR>)
                        .required(false)
                        .help("Count year (default: selection.default_year from config)")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(
                    arg!(-t --"top" <N>)
                        .required(false)
                        .help("Only list the N busiest count points")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(format_arg()),
        )
        .subcommand(command!("ui").about("Open the interactive map explorer"))
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Output format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_flows_arguments() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "roadflow", "flows", "-a", "85", "--year", "2019", "--top", "5", "-f", "json",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "flows");
        assert_eq!(sub.get_one::<String>("authority").unwrap(), "85");
        assert_eq!(sub.get_one::<u16>("year"), Some(&2019));
        assert_eq!(sub.get_one::<usize>("top"), Some(&5));
        assert_eq!(sub.get_one::<String>("format").unwrap(), "json");
    }

    #[test]
    fn test_flows_requires_authority() {
        let result = command_argument_builder().try_get_matches_from(["roadflow", "flows"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "roadflow",
                "authorities",
                "-vv",
                "--base-url",
                "http://localhost:8080/api",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_count("verbose"), 2);
        assert_eq!(
            sub.get_one::<Url>("base-url").map(|u| u.as_str()),
            Some("http://localhost:8080/api")
        );
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["roadflow", "-q", "ui"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("quiet"));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = command_argument_builder()
            .try_get_matches_from(["roadflow", "authorities", "--format", "csv"]);
        assert!(result.is_err());
    }
}
