//! Control loop binary for keimwart.
//!
//! Drives the fetch → decide → publish cadence against a chamber document
//! store reachable over HTTP, and offers a one-shot simulation mode for
//! deriving a directive from a local reading document. Per-cycle failures
//! are reported to the operator and never terminate the loop; only a model
//! that refuses to train at startup is fatal.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use keimwart_core::{extract, ControlDirective, TargetProfile};
use keimwart_model::{GrowthModel, TrainConfig};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Polling cadence used when neither the config file nor the CLI names one.
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Consecutive cycles with defaulted channels after which the advisory is
/// escalated: at that point absence looks like a dead sensor feed rather
/// than a transient gap.
const DEGRADED_FEED_STREAK: u32 = 5;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live fetch-decide-publish loop against the chamber store
    Run {
        /// Base URL of the chamber store (falls back to KEIMWART_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Organism preset providing the target setpoints
        #[arg(long, default_value = "e-coli")]
        preset: String,

        /// JSON config file overriding the preset setpoints
        #[arg(long)]
        config: Option<PathBuf>,

        /// Polling cadence in seconds (overrides the config file)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Per-request HTTP timeout in seconds, clamped below the cadence
        #[arg(long, default_value = "10")]
        http_timeout_secs: u64,

        /// Stop after this many cycles (default: run until stopped)
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Derive a directive from a local reading document (simulation mode)
    Check {
        /// Input file path; reads stdin when omitted
        #[arg(long)]
        path: Option<PathBuf>,

        /// Organism preset providing the target setpoints
        #[arg(long, default_value = "e-coli")]
        preset: String,

        /// JSON config file overriding the preset setpoints
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// External configuration surface: setpoints and cadence, camelCase on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChamberConfig {
    ideal_temperature: Option<f64>,
    ideal_ph: Option<f64>,
    ideal_dissolved_oxygen: Option<f64>,
    poll_interval_seconds: Option<u64>,
}

impl ChamberConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config file {path:?}"))
    }

    /// Layer this config over a preset profile.
    fn apply(&self, mut profile: TargetProfile) -> TargetProfile {
        if let Some(t) = self.ideal_temperature {
            profile.ideal_temperature = t;
        }
        if let Some(ph) = self.ideal_ph {
            profile.ideal_ph = ph;
        }
        if let Some(dissolved) = self.ideal_dissolved_oxygen {
            profile.ideal_dissolved_oxygen = Some(dissolved);
        }
        profile
    }
}

/// Resolve preset + optional config file into the session profile and the
/// cadence the config names, if any.
fn load_profile(preset: &str, config: Option<&Path>) -> Result<(TargetProfile, Option<u64>)> {
    let base = TargetProfile::preset(preset).with_context(|| {
        format!(
            "Unknown organism preset '{preset}' (known: {})",
            TargetProfile::preset_names().join(", ")
        )
    })?;

    match config {
        Some(path) => {
            let config = ChamberConfig::load(path)?;
            let interval = config.poll_interval_seconds;
            Ok((config.apply(base), interval))
        }
        None => Ok((base, None)),
    }
}

/// Blocking client for the chamber document store.
struct StoreClient {
    base: url::Url,
    timeout: Duration,
}

impl StoreClient {
    fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = url::Url::parse(base).context("Invalid base URL")?;
        Ok(Self { base, timeout })
    }

    fn endpoint(&self, leaf: &str) -> Result<url::Url> {
        let mut url = self.base.clone();

        let mut segments: Vec<String> = url
            .path_segments()
            .map(|iter| iter.map(String::from).collect())
            .unwrap_or_default();

        if let Some(last) = segments.last() {
            if last.is_empty() {
                segments.pop();
            }
        }

        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Base URL cannot be used as a base"))?
            .clear()
            .extend(segments)
            .push(leaf);

        Ok(url)
    }

    /// `GET <base>/live_readings`. `Ok(None)` means the store answered but
    /// holds no reading document (JSON null or an empty object).
    fn fetch_readings(&self) -> Result<Option<Value>> {
        let url = self.endpoint("live_readings")?;
        let resp = ureq::get(url.as_str())
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("Failed to fetch readings from {url}"))?;

        let doc: Value = resp
            .into_json()
            .context("Reading document is not valid JSON")?;

        match doc {
            Value::Null => Ok(None),
            Value::Object(ref map) if map.is_empty() => Ok(None),
            Value::Object(_) => Ok(Some(doc)),
            other => anyhow::bail!("Reading document is not a JSON object: {other}"),
        }
    }

    /// `PATCH <base>/control` with the directive document.
    fn publish(&self, directive: &ControlDirective) -> Result<()> {
        let url = self.endpoint("control")?;
        ureq::request("PATCH", url.as_str())
            .timeout(self.timeout)
            .send_json(directive)
            .with_context(|| format!("Failed to publish directive to {url}"))?;
        Ok(())
    }
}

/// What one control cycle concluded. Publishing is kept outside so tests can
/// drive the decision path with injected fetch results.
#[derive(Debug)]
enum CycleOutcome {
    /// A directive was derived and should be published.
    Directive {
        directive: ControlDirective,
        /// Channels the extractor had to default to 0.0.
        defaulted: Vec<&'static str>,
    },
    /// Store reachable, but no reading document present. Advisory only.
    EmptyReading,
    /// Transport error, non-success status or malformed payload.
    FetchFailed(String),
}

/// Decision path of one cycle: fetch result in, outcome out. Never panics
/// and never propagates an error; failures become a reportable outcome.
fn evaluate(
    fetch_result: Result<Option<Value>>,
    model: &GrowthModel,
    profile: &TargetProfile,
) -> CycleOutcome {
    let doc = match fetch_result {
        Ok(Some(doc)) => doc,
        Ok(None) => return CycleOutcome::EmptyReading,
        Err(e) => return CycleOutcome::FetchFailed(format!("{e:#}")),
    };

    let extraction = extract(&doc);
    let score = model.predict(&extraction.reading.features());
    let actions = keimwart_policy::decide(&extraction.reading, profile);
    let directive = ControlDirective::new(actions, score, iso8601_now());

    CycleOutcome::Directive {
        directive,
        defaulted: extraction.defaulted,
    }
}

fn describe(directive: &ControlDirective) -> String {
    let mut line = format!(
        "Thermal: {} | pH: {}",
        directive.thermal.token(),
        directive.ph_pump.token()
    );
    if let Some(oxygen) = &directive.oxygen_flow {
        line.push_str(&format!(" | O2: {}", oxygen.token()));
    }
    line
}

fn run_loop(
    client: &StoreClient,
    model: &GrowthModel,
    profile: &TargetProfile,
    interval: Duration,
    max_cycles: Option<u64>,
) {
    let mut cycles: u64 = 0;
    let mut defaulted_streak: u32 = 0;

    loop {
        match evaluate(client.fetch_readings(), model, profile) {
            CycleOutcome::FetchFailed(msg) => {
                eprintln!("Fetch failed, skipping this cycle: {msg}");
            }
            CycleOutcome::EmptyReading => {
                println!("Store reachable, but no reading document present; nothing published.");
            }
            CycleOutcome::Directive {
                directive,
                defaulted,
            } => {
                if defaulted.is_empty() {
                    defaulted_streak = 0;
                } else {
                    defaulted_streak = defaulted_streak.saturating_add(1);
                    if defaulted_streak >= DEGRADED_FEED_STREAK {
                        eprintln!(
                            "Channels {defaulted:?} missing for {defaulted_streak} consecutive cycles; sensor feed looks degraded"
                        );
                    } else {
                        println!(
                            "Advisory: channels {defaulted:?} absent or malformed, defaulted to 0.0"
                        );
                    }
                }

                println!(
                    "{} (growth score {:.3})",
                    describe(&directive),
                    directive.ai_growth_score
                );

                if let Err(e) = client.publish(&directive) {
                    eprintln!("Publish failed, directive dropped for this cycle: {e:#}");
                }
            }
        }

        cycles += 1;
        if let Some(max) = max_cycles {
            if cycles >= max {
                println!("Max cycles ({max}) reached. Stopping.");
                break;
            }
        }

        thread::sleep(interval);
    }
}

fn run_check(path: Option<&Path>, model: &GrowthModel, profile: &TargetProfile) -> Result<()> {
    let input = match path {
        Some(p) => {
            fs::read_to_string(p).with_context(|| format!("Failed to read input file {p:?}"))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let doc: Value =
        serde_json::from_str(&input).context("Reading document is not valid JSON")?;
    let is_empty = doc.is_null() || doc.as_object().is_some_and(|m| m.is_empty());

    match evaluate(Ok((!is_empty).then_some(doc)), model, profile) {
        CycleOutcome::Directive {
            directive,
            defaulted,
        } => {
            if !defaulted.is_empty() {
                eprintln!("Advisory: channels {defaulted:?} absent or malformed, defaulted to 0.0");
            }
            serde_json::to_writer_pretty(io::stdout(), &directive)?;
            println!();
        }
        CycleOutcome::EmptyReading => {
            println!("No reading document present; no directive derived.");
        }
        CycleOutcome::FetchFailed(msg) => anyhow::bail!(msg),
    }

    Ok(())
}

/// Every request must finish well before the next cycle is due, so a stuck
/// store cannot stall the cadence by more than one cycle.
fn clamp_timeout(http_timeout_secs: u64, interval: Duration) -> Duration {
    let cap = interval.as_secs().saturating_sub(1).max(1);
    Duration::from_secs(http_timeout_secs.clamp(1, cap))
}

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn train_model(profile: &TargetProfile) -> Result<GrowthModel> {
    GrowthModel::train(TrainConfig::for_profile(profile))
        .context("Growth model initialization failed; refusing to start")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            base_url,
            preset,
            config,
            interval_secs,
            http_timeout_secs,
            max_cycles,
        } => {
            let (profile, config_interval) = load_profile(&preset, config.as_deref())?;
            let model = train_model(&profile)?;

            let interval = Duration::from_secs(
                interval_secs
                    .or(config_interval)
                    .unwrap_or(DEFAULT_INTERVAL_SECS)
                    .max(1),
            );
            let timeout = clamp_timeout(http_timeout_secs, interval);

            let base = match base_url {
                Some(url) => url,
                None => env::var("KEIMWART_BASE_URL")
                    .context("--base-url or the KEIMWART_BASE_URL env var is required")?,
            };
            let client = StoreClient::new(&base, timeout)?;

            println!(
                "Controlling against {base} every {}s (profile: {:.1} °C / pH {:.1})",
                interval.as_secs(),
                profile.ideal_temperature,
                profile.ideal_ph
            );
            run_loop(&client, &model, &profile, interval, max_cycles);
            Ok(())
        }
        Commands::Check {
            path,
            preset,
            config,
        } => {
            let (profile, _) = load_profile(&preset, config.as_deref())?;
            let model = train_model(&profile)?;
            run_check(path.as_deref(), &model, &profile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keimwart_core::{AerationAction, PhAction, ThermalAction};
    use serde_json::json;

    fn model() -> GrowthModel {
        GrowthModel::train(TrainConfig::default()).expect("default config should train")
    }

    fn e_coli() -> TargetProfile {
        TargetProfile::preset("e-coli").expect("preset should exist")
    }

    #[test]
    fn test_endpoint_urls() {
        let cases = vec![
            ("http://host", "http://host/live_readings"),
            ("http://host/", "http://host/live_readings"),
            ("http://host/chamber-1", "http://host/chamber-1/live_readings"),
            ("http://host/chamber-1/", "http://host/chamber-1/live_readings"),
        ];

        for (base, expected) in cases {
            let client = StoreClient::new(base, Duration::from_secs(1)).unwrap();
            assert_eq!(client.endpoint("live_readings").unwrap().as_str(), expected);
        }

        let client = StoreClient::new("http://host/chamber-1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("control").unwrap().as_str(),
            "http://host/chamber-1/control"
        );
    }

    #[test]
    fn evaluate_empty_fetch_is_an_advisory_without_directive() {
        let outcome = evaluate(Ok(None), &model(), &e_coli());
        assert!(matches!(outcome, CycleOutcome::EmptyReading));
    }

    #[test]
    fn evaluate_isolates_fetch_failures() {
        let outcome = evaluate(Err(anyhow::anyhow!("connection refused")), &model(), &e_coli());
        match outcome {
            CycleOutcome::FetchFailed(msg) => assert!(msg.contains("connection refused")),
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[test]
    fn evaluate_on_target_reading_yields_all_stable_and_high_score() {
        let doc = json!({
            "temperature": 37.0,
            "ph": 7.0,
            "dissolvedOxygen": 40.0,
            "opticalDensity": 0.8
        });

        match evaluate(Ok(Some(doc)), &model(), &e_coli()) {
            CycleOutcome::Directive {
                directive,
                defaulted,
            } => {
                assert!(defaulted.is_empty());
                assert_eq!(directive.thermal, ThermalAction::Stable);
                assert_eq!(directive.ph_pump, PhAction::Stable);
                assert_eq!(directive.oxygen_flow, Some(AerationAction::Stable));
                assert!(
                    directive.ai_growth_score > 0.7,
                    "score unexpectedly low: {}",
                    directive.ai_growth_score
                );
                assert!(directive.ai_growth_score <= 1.0);
                assert!(!directive.timestamp.is_empty());
            }
            other => panic!("expected Directive, got {other:?}"),
        }
    }

    #[test]
    fn evaluate_missing_ph_still_produces_a_directive() {
        let doc = json!({"temperature": 37.0, "dissolvedOxygen": 40.0, "opticalDensity": 0.8});

        match evaluate(Ok(Some(doc)), &model(), &e_coli()) {
            CycleOutcome::Directive {
                directive,
                defaulted,
            } => {
                assert_eq!(defaulted, vec!["ph"]);
                // The defaulted 0.0 reads as strongly acidic.
                assert_eq!(directive.ph_pump, PhAction::AddBase);
            }
            other => panic!("expected Directive, got {other:?}"),
        }
    }

    #[test]
    fn chamber_config_parses_the_camel_case_surface() {
        let config: ChamberConfig = serde_json::from_str(
            r#"{
                "idealTemperature": 30.0,
                "idealPh": 5.0,
                "idealDissolvedOxygen": 30.0,
                "pollIntervalSeconds": 8
            }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_seconds, Some(8));

        let profile = config.apply(e_coli());
        assert_eq!(profile.ideal_temperature, 30.0);
        assert_eq!(profile.ideal_ph, 5.0);
        assert_eq!(profile.ideal_dissolved_oxygen, Some(30.0));
        // Bands come from the preset, not the config surface.
        assert_eq!(profile.ph_band, 0.2);
    }

    #[test]
    fn partial_config_keeps_preset_setpoints() {
        let config: ChamberConfig = serde_json::from_str(r#"{"idealPh": 6.5}"#).unwrap();

        let profile = config.apply(e_coli());
        assert_eq!(profile.ideal_temperature, 37.0);
        assert_eq!(profile.ideal_ph, 6.5);
        assert_eq!(config.poll_interval_seconds, None);
    }

    #[test]
    fn unknown_preset_is_a_startup_error() {
        let err = load_profile("tardigrade", None).unwrap_err();
        assert!(err.to_string().contains("tardigrade"));
        assert!(err.to_string().contains("e-coli"));
    }

    #[test]
    fn timeout_is_clamped_below_the_cadence() {
        assert_eq!(
            clamp_timeout(10, Duration::from_secs(5)),
            Duration::from_secs(4)
        );
        assert_eq!(
            clamp_timeout(2, Duration::from_secs(5)),
            Duration::from_secs(2)
        );
        assert_eq!(
            clamp_timeout(0, Duration::from_secs(5)),
            Duration::from_secs(1)
        );
        // Sub-2s cadences still leave a 1s request budget.
        assert_eq!(
            clamp_timeout(10, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn describe_covers_the_optional_oxygen_channel() {
        let with_oxygen = ControlDirective::new(
            keimwart_core::ActionSet {
                thermal: ThermalAction::HeatOn,
                ph: PhAction::Stable,
                aeration: Some(AerationAction::DecreaseAeration),
            },
            0.4,
            iso8601_now(),
        );
        assert_eq!(
            describe(&with_oxygen),
            "Thermal: HEAT_ON | pH: STABLE | O2: DECREASE_AERATION"
        );

        let without_oxygen = ControlDirective::new(
            keimwart_core::ActionSet {
                thermal: ThermalAction::Stable,
                ph: PhAction::AddAcid,
                aeration: None,
            },
            0.4,
            iso8601_now(),
        );
        assert_eq!(describe(&without_oxygen), "Thermal: STABLE | pH: ADD_ACID");
    }
}
