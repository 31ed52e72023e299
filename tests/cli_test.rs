//! Integration tests for argument parsing and command dispatch.

use clap::{CommandFactory, Parser};
use rstest::rstest;

use topotree::cli::{execute, Cli, CliError, Commands};
use topotree::exitcode;
use topotree::util::testing;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("topotree").chain(args.iter().copied()))
        .expect("valid arguments")
}

#[test]
fn verify_cli() {
    Cli::command().debug_assert();
}

#[test]
fn given_global_flags_after_subcommand_when_parsing_then_accepted() {
    let cli = parse(&["closest", "pu:3", "-n", "4", "-s", "2 4", "-dd"]);

    assert_eq!(cli.synthetic.as_deref(), Some("2 4"));
    assert_eq!(cli.debug, 2);
    match cli.command {
        Some(Commands::Closest { object, count }) => {
            assert_eq!(object, "pu:3");
            assert_eq!(count, Some(4));
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[rstest]
#[case(&["show"])]
#[case(&["show", "--no-cpuset", "--no-os-index"])]
#[case(&["info"])]
#[case(&["check"])]
#[case(&["closest", "3:5"])]
#[case(&["ancestor", "pu:0", "core:3"])]
#[case(&["mask", "0-3,9"])]
fn given_valid_command_when_executing_then_succeeds(#[case] args: &[&str]) {
    // Arrange
    testing::init_test_setup();
    let mut all = vec!["-s", "2 2 2"];
    all.extend_from_slice(args);
    let cli = parse(&all);

    // Act
    let result = execute(&cli);

    // Assert
    assert!(result.is_ok(), "{:?}", result.err());
}

#[rstest]
#[case(&["-s", "2 0", "show"], exitcode::DATAERR)]
#[case(&["-s", "2 2", "closest", "pu:9"], exitcode::USAGE)]
#[case(&["-s", "2 2", "closest", "pu"], exitcode::USAGE)]
#[case(&["-s", "2 2", "closest", "pu:1", "-n", "0"], exitcode::USAGE)]
#[case(&["-s", "2 2", "mask", "0-2000"], exitcode::USAGE)]
#[case(&["-s", "2 2", "mask", "abc"], exitcode::USAGE)]
fn given_bad_input_when_executing_then_fails_with_sysexits_code(
    #[case] args: &[&str],
    #[case] code: i32,
) {
    let cli = parse(args);

    let err: CliError = execute(&cli).unwrap_err();

    assert_eq!(err.exit_code(), code, "{}", err);
}
