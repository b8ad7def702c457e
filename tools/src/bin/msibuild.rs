use clap::{App, Arg};
use msidb::{Database, Insert, OpenMode, Record, SummaryInfo};
use std::path::Path;
use std::process;
use uuid::Uuid;

// ========================================================================= //

fn default_summary_info() -> SummaryInfo {
    let mut summary_info = SummaryInfo::new();
    summary_info.set_title("Installation Database");
    summary_info.set_keywords("Installer, MSI");
    summary_info.set_template(";1033");
    summary_info.set_creating_application("msidb msibuild");
    summary_info.set_page_count(200);
    summary_info.set_word_count(0);
    summary_info.set_character_count(0);
    summary_info.set_uuid(Uuid::new_v4());
    summary_info
}

fn open_database(path: &str) -> msidb::Result<Database> {
    if Path::new(path).exists() {
        return Database::open(path, OpenMode::Transact);
    }
    let mut db = Database::create(path)?;
    db.set_summary_info(&default_summary_info())?;
    db.commit()?;
    Ok(db)
}

fn set_summary(db: &mut Database, values: &[&str]) -> msidb::Result<()> {
    let mut summary_info = db.summary_info()?;
    if let Some(subject) = values.first() {
        summary_info.set_subject(*subject);
    }
    if let Some(author) = values.get(1) {
        summary_info.set_author(*author);
    }
    if let Some(template) = values.get(2) {
        summary_info.set_template(*template);
    }
    if let Some(uuid) = values.get(3) {
        let trimmed = uuid.trim_start_matches('{').trim_end_matches('}');
        match Uuid::parse_str(trimmed) {
            Ok(uuid) => summary_info.set_uuid(uuid),
            Err(_) => {
                return Err(msidb::Error::InvalidParameter(format!(
                    "{:?} is not a valid UUID",
                    uuid
                )))
            }
        }
    }
    db.set_summary_info(&summary_info)
}

fn add_stream(db: &mut Database, name: &str, path: &str)
              -> msidb::Result<()> {
    let mut params = Record::new(2);
    params.set_string(1, name)?;
    params.load_stream_from_file(2, path)?;
    let insert = Insert::into("_Streams").columns(&["Name", "Data"]);
    let mut query = db.open_query(insert)?;
    query.execute(db, Some(&params))?;
    query.close(db)
}

fn run(matches: &clap::ArgMatches) -> msidb::Result<()> {
    let path = matches.value_of("path").unwrap_or_default();
    let mut db = open_database(path)?;
    if let Some(values) = matches.values_of("summary") {
        let values: Vec<&str> = values.collect();
        set_summary(&mut db, &values)?;
    }
    if let Some(files) = matches.values_of("import") {
        for file in files {
            db.import(file)?;
        }
    }
    if let Some(values) = matches.values_of("stream") {
        let values: Vec<&str> = values.collect();
        for pair in values.chunks(2) {
            if let [name, file] = pair {
                add_stream(&mut db, name, file)?;
            }
        }
    }
    db.commit()
}

fn main() {
    let matches = App::new("msibuild")
        .version("0.1")
        .author("Matthew D. Steele <mdsteele@alum.mit.edu>")
        .about("Creates or updates an MSI database")
        .arg(Arg::with_name("path").required(true))
        .arg(Arg::with_name("summary")
                 .short("s")
                 .value_name("name")
                 .min_values(1)
                 .max_values(4)
                 .help("Sets the subject, author, template, and UUID"))
        .arg(Arg::with_name("import")
                 .short("i")
                 .value_name("table.idt")
                 .multiple(true)
                 .help("Imports tables from .idt files"))
        .arg(Arg::with_name("stream")
                 .short("a")
                 .value_names(&["stream", "file"])
                 .number_of_values(2)
                 .multiple(true)
                 .help("Adds a file as a raw stream"))
        .get_matches();
    if let Err(error) = run(&matches) {
        eprintln!("error: {} ({})", error, error.code());
        process::exit(1);
    }
}
