use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_run_flags() {
    let cli = Cli::try_parse_from([
        "yuniql", "run", "-p", "db", "-c", "app.duckdb", "-a", "-t", "v1.02", "-k", "A=1",
        "-k", "B=2", "--transaction-mode", "none", "-d",
    ])
    .unwrap();
    assert!(cli.global.debug);
    assert_eq!(cli.global.path, Some(PathBuf::from("db")));
    let Commands::Run(args) = cli.command else {
        panic!("expected run");
    };
    assert!(args.autocreate_db);
    assert_eq!(args.target_version.as_deref(), Some("v1.02"));
    assert_eq!(args.tokens, vec!["A=1", "B=2"]);
    assert_eq!(args.connection.connection_string.as_deref(), Some("app.duckdb"));
}

#[test]
fn test_info_is_an_alias_for_list() {
    let cli = Cli::try_parse_from(["yuniql", "info", "--output", "json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::List(ListArgs {
            output: ListOutput::Json,
            ..
        })
    ));
}

#[test]
fn test_vnext_major_and_minor_conflict() {
    assert!(Cli::try_parse_from(["yuniql", "vnext", "-M", "-m"]).is_err());
    let cli = Cli::try_parse_from(["yuniql", "vnext", "-M", "-f", "01_init.sql"]).unwrap();
    let Commands::Vnext(args) = cli.command else {
        panic!("expected vnext");
    };
    assert!(args.major);
    assert_eq!(args.file, Some(PathBuf::from("01_init.sql")));
}
