use std::io::Write;
use std::path::{Path, PathBuf};

use api_shared::PatientSummary;
use clap::{Parser, Subcommand};
use fhirbrush_core::{
    analysis::derive_cache_key, config::resolve_data_file, constants::DEFAULT_CACHE_NAMESPACE,
    CoreConfig, NonEmptyText, PatientService, SimulationSession, StreamMessage,
};

#[derive(Parser)]
#[command(name = "fhirbrush")]
#[command(about = "FHIRBrush clinical dashboard CLI")]
struct Cli {
    /// Dataset file (defaults to FHIRBRUSH_DATA_FILE, then data/synthetic_patients.json)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients ranked by data richness
    List {
        /// Also write the summaries to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Show severity for one patient, or for every patient
    Severity {
        /// Patient id (optional)
        id: Option<String>,
    },
    /// Print a patient's full record as JSON
    Record {
        /// Patient id
        id: String,
    },
    /// Print simulated stream frames without waiting between ticks
    Stream {
        /// Patient id
        id: String,
        /// Number of frames to print
        #[arg(long, default_value_t = 5)]
        ticks: usize,
    },
    /// Derive the analysis cache key for a snapshot
    CacheKey {
        /// Patient id
        patient_id: String,
        /// Snapshot as a JSON document
        snapshot: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List { csv }) => {
            let service = load_service(cli.data_file)?;
            let patients = service.ranked_patients();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in &patients {
                println!(
                    "{:<16} {:<28} {:<8} score {:>4} (obs {}, cond {}, meds {}, enc {})",
                    p.id, p.name, p.gender, p.score, p.observations, p.conditions, p.medications, p.encounters
                );
            }
            if let Some(path) = csv {
                write_summaries_csv(&path, &patients)?;
                println!("Wrote {} rows to {}", patients.len(), path.display());
            }
        }
        Some(Commands::Severity { id }) => {
            let service = load_service(cli.data_file)?;
            let results = match id {
                Some(id) => vec![service.severity(&id)],
                None => service.severity_all(),
            };
            for r in results {
                let level = serde_json::to_value(r.severity)?;
                println!(
                    "{:<16} {:<3} {:<28} {:<6} {}",
                    r.patient_id,
                    r.initials,
                    r.name,
                    level.as_str().unwrap_or_default(),
                    r.reasons.join("; ")
                );
            }
        }
        Some(Commands::Record { id }) => {
            let service = load_service(cli.data_file)?;
            match service.full_record(&id) {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(e) => eprintln!("Error reading record: {}", e),
            }
        }
        Some(Commands::Stream { id, ticks }) => {
            let service = load_service(cli.data_file)?;
            if !service.contains(&id) {
                eprintln!("Error: unknown patient {}", id);
                return Ok(());
            }
            let mut session = SimulationSession::new(id);
            for _ in 0..ticks {
                let message = StreamMessage::NewObservation(session.next_observation());
                println!("{}", serde_json::to_string(&message)?);
            }
        }
        Some(Commands::CacheKey {
            patient_id,
            snapshot,
        }) => {
            let snapshot: serde_json::Value = serde_json::from_str(&snapshot)?;
            let namespace = std::env::var("FHIRBRUSH_CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CACHE_NAMESPACE.to_string());
            println!("{}", derive_cache_key(&namespace, &patient_id, &snapshot));
        }
        None => {
            println!("Use 'fhirbrush --help' for commands");
        }
    }

    Ok(())
}

fn load_service(data_file: Option<PathBuf>) -> Result<PatientService, Box<dyn std::error::Error>> {
    let override_file = data_file.or_else(|| std::env::var("FHIRBRUSH_DATA_FILE").ok().map(PathBuf::from));
    let cfg = CoreConfig::new(
        resolve_data_file(override_file)?,
        NonEmptyText::new(DEFAULT_CACHE_NAMESPACE)?,
    );
    Ok(PatientService::load(&cfg)?)
}

const CSV_HEADER: &str =
    "patient_id,name,gender,dob,num_conditions,num_observations,num_medications,num_encounters,score";

fn write_summaries_csv(path: &Path, patients: &[PatientSummary]) -> std::io::Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{CSV_HEADER}")?;
    for p in patients {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            csv_field(&p.id),
            csv_field(&p.name),
            csv_field(&p.gender),
            csv_field(p.birth_date.as_deref().unwrap_or("")),
            p.conditions,
            p.observations,
            p.medications,
            p.encounters,
            p.score
        )?;
    }
    out.flush()
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_field("Ada Okafor"), "Ada Okafor");
        assert_eq!(csv_field("Okafor, Ada"), "\"Okafor, Ada\"");
        assert_eq!(csv_field("the \"one\""), "\"the \"\"one\"\"\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("patients_summary.csv");
        let patients = vec![PatientSummary {
            id: "synth-001".into(),
            name: "James Morrison".into(),
            gender: "male".into(),
            birth_date: Some("1951-07-02".into()),
            conditions: 2,
            observations: 5,
            medications: 3,
            encounters: 1,
            score: 18,
        }];

        write_summaries_csv(&path, &patients).expect("write csv");
        let text = std::fs::read_to_string(&path).expect("read csv");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "synth-001,James Morrison,male,1951-07-02,2,5,3,1,18");
    }

    #[test]
    fn cli_parses_global_data_file() {
        let cli = Cli::try_parse_from(["fhirbrush", "--data-file", "x.json", "severity", "synth-001"])
            .expect("valid args");
        assert_eq!(cli.data_file, Some(PathBuf::from("x.json")));
        assert!(matches!(cli.command, Some(Commands::Severity { id: Some(_) })));
    }
}
