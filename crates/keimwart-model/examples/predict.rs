use std::env;
use std::fs;
use std::io::{self, Read};

use keimwart_core::{extract, TargetProfile};
use keimwart_model::{GrowthModel, TrainConfig};
use serde_json::{json, Value};

/// Scores one reading document against the default E. coli profile.
/// Reads a file given as the first argument, or stdin when none is given.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let doc: Value = if input.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&input)?
    };

    let profile = TargetProfile::default();
    let model = GrowthModel::train(TrainConfig::for_profile(&profile))?;

    let extraction = extract(&doc);
    let score = model.predict(&extraction.reading.features());

    serde_json::to_writer_pretty(
        io::stdout(),
        &json!({
            "score": (score * 1000.0).round() / 1000.0,
            "defaulted": extraction.defaulted,
        }),
    )?;
    println!();

    Ok(())
}
