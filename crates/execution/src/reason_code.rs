//! Classification of a god-command rejection reason into a machine-readable
//! reason code (step 4's exact-phrase map).

/// Classify a rejection `reason` string into a `reasonCode`.
pub fn classify_reason(reason: &str) -> String {
    match reason {
        "Duplicate operation ignored." => "DUPLICATE_HANDOFF".to_string(),
        "Unknown town." => "UNKNOWN_TOWN".to_string(),
        "Unknown project." => "UNKNOWN_PROJECT".to_string(),
        "Unknown salvage target." => "UNKNOWN_SALVAGE_TARGET".to_string(),
        "Major mission already active." => "MAJOR_MISSION_ALREADY_ACTIVE".to_string(),
        "No major mission briefing is available. talk to the mayor first." => {
            "MAYOR_BRIEFING_REQUIRED".to_string()
        }
        other if other.starts_with("mayor cooldown active until day ") => "MAYOR_COOLDOWN_ACTIVE".to_string(),
        other => uppercase_snake(other),
    }
}

fn uppercase_snake(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_sep = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        "ENGINE_REJECTED".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_phrases_map_to_known_codes() {
        assert_eq!(classify_reason("Duplicate operation ignored."), "DUPLICATE_HANDOFF");
        assert_eq!(classify_reason("Unknown town."), "UNKNOWN_TOWN");
        assert_eq!(classify_reason("Unknown project."), "UNKNOWN_PROJECT");
        assert_eq!(classify_reason("Unknown salvage target."), "UNKNOWN_SALVAGE_TARGET");
        assert_eq!(classify_reason("Major mission already active."), "MAJOR_MISSION_ALREADY_ACTIVE");
        assert_eq!(
            classify_reason("No major mission briefing is available. talk to the mayor first."),
            "MAYOR_BRIEFING_REQUIRED"
        );
    }

    #[test]
    fn cooldown_prefix_maps_regardless_of_day() {
        assert_eq!(classify_reason("mayor cooldown active until day 12"), "MAYOR_COOLDOWN_ACTIVE");
    }

    #[test]
    fn unrecognized_reason_falls_back_to_uppercase_snake() {
        assert_eq!(classify_reason("Something went wrong!"), "SOMETHING_WENT_WRONG");
    }

    #[test]
    fn empty_reason_falls_back_to_engine_rejected() {
        assert_eq!(classify_reason(""), "ENGINE_REJECTED");
        assert_eq!(classify_reason("!!!"), "ENGINE_REJECTED");
    }
}
