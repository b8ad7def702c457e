use chrono::{DateTime, Utc};
use clap::{App, Arg, SubCommand};
use msidb::{Database, OpenMode};
use std::io::{self, Write};
use std::process;
use std::time::SystemTime;

// ========================================================================= //

fn format_timestamp(timestamp: SystemTime) -> String {
    DateTime::<Utc>::from(timestamp).format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn print_summary_info(db: &mut Database) -> msidb::Result<()> {
    let info = db.summary_info()?;
    let codepage = info.codepage();
    let fields: Vec<(&str, Option<String>)> = vec![
        ("Code page",
         Some(format!("{} ({})", codepage.id(), codepage.name()))),
        ("Title", info.title().map(str::to_string)),
        ("Subject", info.subject().map(str::to_string)),
        ("Author", info.author().map(str::to_string)),
        ("Keywords", info.keywords().map(str::to_string)),
        ("Template", info.template().map(str::to_string)),
        ("Package code", info.uuid().map(|uuid| uuid.braced().to_string())),
        ("Created", info.creation_time().map(format_timestamp)),
        ("Application", info.creating_application().map(str::to_string)),
        ("Schema", info.page_count().map(|version| version.to_string())),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{:>12}: {}", label, value);
        }
    }
    if let Some(comments) = info.comments() {
        println!("{:>12}:", "Comments");
        for line in comments.lines() {
            println!("{:14}{}", "", line);
        }
    }
    Ok(())
}

fn run(matches: &clap::ArgMatches) -> msidb::Result<()> {
    let path = matches.value_of("path").unwrap_or_default();
    let mut db = Database::open(path, OpenMode::ReadOnly)?;
    match matches.subcommand() {
        ("tables", _) => {
            for name in db.table_names() {
                println!("{}", name);
            }
        }
        ("streams", _) => {
            for name in db.stream_names() {
                println!("{}", name);
            }
        }
        ("suminfo", _) => print_summary_info(&mut db)?,
        ("export", Some(sub)) => {
            let table = sub.value_of("table").unwrap_or_default();
            match sub.value_of("dir") {
                Some(dir) => {
                    db.export_to_folder(table, dir)?;
                }
                None if sub.is_present("sql") => {
                    let stdout = io::stdout();
                    db.export_sql(table, stdout.lock())?;
                }
                None => {
                    let stdout = io::stdout();
                    db.export(table, stdout.lock())?;
                }
            }
        }
        ("extract", Some(sub)) => {
            let name = sub.value_of("stream").unwrap_or_default();
            let stream = db.read_stream(name)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(stream.data())?;
            out.flush()?;
        }
        _ => {
            for name in db.table_names() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

fn main() {
    let matches = App::new("msiinfo")
        .version("0.1")
        .author("Matthew D. Steele <mdsteele@alum.mit.edu>")
        .about("Inspects MSI databases")
        .arg(Arg::with_name("path").required(true))
        .subcommand(SubCommand::with_name("tables").about("Lists the tables"))
        .subcommand(SubCommand::with_name("streams")
                        .about("Lists the raw streams"))
        .subcommand(SubCommand::with_name("suminfo")
                        .about("Prints the summary information"))
        .subcommand(SubCommand::with_name("export")
                        .about("Exports a table in .idt form")
                        .arg(Arg::with_name("sql")
                                 .short("s")
                                 .help("Writes SQL statements instead"))
                        .arg(Arg::with_name("table").required(true))
                        .arg(Arg::with_name("dir")))
        .subcommand(SubCommand::with_name("extract")
                        .about("Writes a raw stream to stdout")
                        .arg(Arg::with_name("stream").required(true)))
        .get_matches();
    if let Err(error) = run(&matches) {
        eprintln!("error: {} ({})", error, error.code());
        process::exit(1);
    }
}
