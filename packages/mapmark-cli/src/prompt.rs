//! Interactive decisions for suspended geocoding items.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use geocode::PendingItem;

/// What the operator decided about a suspended item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Choose(usize),
    Coordinates { lat: f64, lng: f64 },
    Skip,
    Cancel,
}

/// Pick one of several candidates.
pub fn disambiguate(pending: &PendingItem) -> Result<Decision> {
    println!();
    println!(
        "{} {}",
        "Several places match".bright_yellow(),
        pending.item.source_address.bold()
    );

    let candidates = pending.candidates();
    let mut options: Vec<String> = candidates
        .iter()
        .map(|c| match c.match_quality {
            Some(quality) => format!("{} ({})", c.formatted_address, quality),
            None => c.formatted_address.clone(),
        })
        .collect();
    options.push("Skip this address".to_string());
    options.push("Cancel the rest of the batch".to_string());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which one?")
        .items(&options)
        .default(0)
        .interact()?;

    Ok(match selection {
        i if i < candidates.len() => Decision::Choose(i),
        i if i == candidates.len() => Decision::Skip,
        _ => Decision::Cancel,
    })
}

/// Enter coordinates by hand, skip, or cancel.
pub fn not_found(pending: &PendingItem) -> Result<Decision> {
    println!();
    println!(
        "{} {}",
        "No match for".bright_yellow(),
        pending.item.source_address.bold()
    );

    let options = ["Enter coordinates", "Skip this address", "Cancel the rest of the batch"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What now?")
        .items(&options)
        .default(0)
        .interact()?;

    match selection {
        0 => {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Coordinates (lat, lng)")
                .validate_with(|s: &String| parse_coordinates(s).map(|_| ()))
                .interact_text()?;
            let (lat, lng) = parse_coordinates(&input).map_err(anyhow::Error::msg)?;
            Ok(Decision::Coordinates { lat, lng })
        }
        1 => Ok(Decision::Skip),
        _ => Ok(Decision::Cancel),
    }
}

/// Parse `"lat, lng"` (comma or whitespace separated).
pub fn parse_coordinates(input: &str) -> std::result::Result<(f64, f64), String> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let [lat, lng] = parts.as_slice() else {
        return Err("expected two numbers: latitude, longitude".to_string());
    };
    let lat: f64 = lat.parse().map_err(|_| format!("not a number: {}", lat))?;
    let lng: f64 = lng.parse().map_err(|_| format!("not a number: {}", lng))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err("latitude must be between -90 and 90".to_string());
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err("longitude must be between -180 and 180".to_string());
    }
    Ok((lat, lng))
}
