//! Clarion Dump CLI
//!
//! Dump Clarion databases to text, CSV, SQL or JSON, or decrypt them in place.

use clap::{ArgAction, Parser};
use clarion_dump::options::DEFAULT_CHARSET;
use clarion_dump::parser::KeyFileResolver;
use clarion_dump::{
    decrypt_file, output, ClarionError, ClarionFile, DumpOptions, KeyLocation, OutputFormat, SqlQuote,
};
use log::LevelFilter;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clarion-dump")]
#[command(about = "Dump Clarion databases to text, CSV, SQL or JSON")]
#[command(version)]
struct Cli {
    /// Clarion data file (.DAT)
    input: PathBuf,

    /// Dump active records only
    #[arg(short = 'd', long)]
    dump_active: bool,

    /// Dump all records, active and deleted
    #[arg(short = 'D', long)]
    dump_data: bool,

    /// Dump the file and memo headers
    #[arg(short = 'm', long)]
    dump_meta: bool,

    /// Field separator for CSV output
    #[arg(short = 'f', long, default_value_t = ';')]
    field_separator: char,

    /// Dump data or schema as CSV
    #[arg(short = 'c', long, conflicts_with = "sql")]
    csv: bool,

    /// Dump data or schema as SQL
    #[arg(short = 'S', long)]
    sql: bool,

    /// Dump the database schema
    #[arg(short = 's', long)]
    schema: bool,

    /// Quote SQL identifiers with backticks
    #[arg(short = 'M', long)]
    mysql: bool,

    /// Do not dump memo entries
    #[arg(short = 'n', long)]
    no_memo: bool,

    /// Convert strings from CHARSET to UTF-8 [default charset: ISO8859-1]
    #[arg(
        short = 'U',
        long = "utf8",
        value_name = "CHARSET",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_CHARSET
    )]
    charset: Option<String>,

    /// Decrypt the database in place, using key location 1-4
    #[arg(short = 'x', long, value_name = "KEY_LOCATION", value_parser = parse_key_location)]
    decrypt: Option<KeyLocation>,

    /// Dump metadata and records as one JSON document
    #[arg(short = 'j', long, conflicts_with_all = ["csv", "sql"])]
    json: bool,

    /// Pretty-print JSON output
    #[arg(short, long, requires = "json")]
    pretty: bool,

    /// Show more log output (repeatable). The version is printed by -V/--version
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_key_location(value: &str) -> Result<KeyLocation, String> {
    let number: u8 = value
        .parse()
        .map_err(|_| format!("`{}` is not a key location", value))?;
    KeyLocation::try_from(number).map_err(|n| format!("key location {} is not 1-4", n))
}

impl Cli {
    fn dump_options(&self) -> DumpOptions {
        let format = if self.json {
            OutputFormat::Json
        } else if self.csv {
            OutputFormat::Csv
        } else if self.sql {
            OutputFormat::Sql
        } else {
            OutputFormat::Text
        };

        let selected = self.dump_active || self.dump_data || self.dump_meta || self.schema;
        let modified = self.no_memo || self.csv || self.sql || self.json;
        let (data, meta, schema) = match (selected, modified) {
            // Nothing asked for: dump everything.
            (false, false) => (true, true, true),
            // Only output modifiers: dump the records.
            (false, true) => (true, false, false),
            (true, _) => (self.dump_data, self.dump_meta, self.schema),
        };

        DumpOptions {
            active_only: self.dump_active,
            data,
            meta,
            schema,
            memo: !self.no_memo,
            format,
            field_separator: self.field_separator,
            quote: if self.mysql { SqlQuote::Mysql } else { SqlQuote::Ansi },
            charset: self.charset.clone(),
            pretty: self.pretty,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.decrypt {
        Some(location) => decrypt(&cli, location),
        None => dump(&cli),
    };
    std::process::exit(code);
}

fn decrypt(cli: &Cli, location: KeyLocation) -> i32 {
    let resolver = KeyFileResolver::new(&cli.input);
    match decrypt_file(&cli.input, location, &resolver) {
        Ok(report) => {
            eprintln!(
                "Decrypted {} with key {}: {} records, {} memo blocks",
                cli.input.display(),
                report.key,
                report.records,
                report.memo_blocks
            );
            0
        }
        Err(ClarionError::NotEncrypted) => {
            eprintln!("Database is not encrypted; re-run without -x");
            0
        }
        Err(e) => {
            eprintln!("Error decrypting {}: {}", cli.input.display(), e);
            1
        }
    }
}

fn dump(cli: &Cli) -> i32 {
    let options = cli.dump_options();

    let mut file = match ClarionFile::open(&cli.input, &options.read_options()) {
        Ok(file) => file,
        Err(ClarionError::Encrypted) => {
            eprintln!("Database is encrypted, make backups and re-run with -x");
            return 1;
        }
        Err(e) => {
            eprintln!("Error processing {}: {}", cli.input.display(), e);
            return e.exit_code();
        }
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = BufWriter::new(stdout.lock());
    let mut diag = BufWriter::new(stderr.lock());

    match output::dump(&mut file, &mut out, &mut diag, &options) {
        Ok(()) => 0,
        Err(ClarionError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => 0,
        Err(e) => {
            drop(out);
            drop(diag);
            eprintln!("Error processing {}: {}", cli.input.display(), e);
            e.exit_code()
        }
    }
}
