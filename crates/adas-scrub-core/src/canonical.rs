//! Name canonicalization for systems, operations, and calibration types.
//!
//! Rule tables and estimates name the same ADAS component many ways
//! ("SAS", "Steering angle sensor", "steering-angle sensor reset"). The
//! functions here map those spellings onto stable display labels, and
//! [`normalize_key`] reduces any label to a comparison key used for all
//! deduplication and grouping.
//!
//! Every canonicalizer is idempotent: feeding a canonical label back in
//! returns the same label.

/// Separator used when several calibration types merge into one group.
pub const DEFAULT_TYPE_SEPARATOR: &str = "/";

pub const STEERING_ANGLE_SENSOR: &str = "Steering Angle Sensor";
pub const FORWARD_CAMERA: &str = "Forward Camera";
pub const FRONT_RADAR: &str = "Front Radar";
pub const BLIND_SPOT: &str = "Blind Spot Monitoring";
pub const SURROUND_VIEW: &str = "Surround View Camera";
pub const REAR_CAMERA: &str = "Rear Camera";
pub const PARKING_SENSORS: &str = "Parking Sensors";
pub const HEADLAMP_AIMING: &str = "Headlamp Aiming";
pub const NIGHT_VISION: &str = "Night Vision Camera";

/// Known system aliases, checked in order: `(substrings, exact keys, label)`.
const SYSTEM_ALIASES: &[(&[&str], &[&str], &str)] = &[
    (
        &["steeringangle", "steeringwheelangle", "steeringsensor"],
        &["sas", "steering"],
        STEERING_ANGLE_SENSOR,
    ),
    (&["nightvision"], &[], NIGHT_VISION),
    (
        &["surroundview", "aroundview", "360", "birdseye", "multiview", "panoramicview"],
        &[],
        SURROUND_VIEW,
    ),
    (
        &["blindspot", "rearradar", "sideradar", "rearcrosstraffic", "lanechangeassist"],
        &["bsm", "blis", "rcta"],
        BLIND_SPOT,
    ),
    (
        &["rearcamera", "backupcamera", "rearviewcamera", "reversecamera"],
        &[],
        REAR_CAMERA,
    ),
    (
        &["parkassist", "parkingsensor", "parkingaid", "parksensor", "sonar", "ultrasonic"],
        &[],
        PARKING_SENSORS,
    ),
    (
        &["headlamp", "headlight", "adaptivefrontlighting"],
        &["afs"],
        HEADLAMP_AIMING,
    ),
    (
        &[
            "forwardcamera",
            "frontcamera",
            "windshieldcamera",
            "forwardfacingcamera",
            "multipurposecamera",
            "monocamera",
            "stereocamera",
            "lanedeparture",
            "lanekeep",
            "eyesight",
        ],
        &["lka", "ldw", "fcm"],
        FORWARD_CAMERA,
    ),
    (
        &[
            "frontradar",
            "forwardradar",
            "adaptivecruise",
            "distancesensor",
            "millimeterwave",
            "millimetrewave",
            "longrangeradar",
            "accradar",
            "accsensor",
            "accmodule",
            "distronic",
        ],
        &["acc"],
        FRONT_RADAR,
    ),
];

/// Keys too vague to resolve without knowing the repair operation.
const AMBIGUOUS_CAMERA: &[&str] = &["camera", "cameras", "adascamera"];
const AMBIGUOUS_RADAR: &[&str] = &["radar", "radars", "radarsensor", "sensor", "sensors"];

/// Words describing what is done to a system rather than which system.
const OPERATION_WORDS: &[&str] = &[
    "calibration",
    "calibrations",
    "calibrate",
    "recalibration",
    "recalibrate",
    "reset",
    "relearn",
    "initialization",
    "initialisation",
    "initialize",
    "aim",
    "aiming",
    "check",
    "verification",
    "static",
    "dynamic",
    "procedure",
    "required",
    "adjustment",
    "of",
    "the",
    "for",
];

/// Comparison key: lowercase alphanumerics only, `&` spelled as `and`.
pub fn normalize_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '&' {
            out.push_str("and");
        } else if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Canonical display label for an ADAS system name.
///
/// `operation_hint` (the repair operation that triggered the match) is
/// consulted only for labels too vague to resolve alone, like "camera".
pub fn canonical_system_name(name: &str, operation_hint: Option<&str>) -> String {
    let key = normalize_key(name);
    if key.is_empty() {
        return String::new();
    }

    for (contains, exact, label) in SYSTEM_ALIASES {
        if exact.contains(&key.as_str()) || contains.iter().any(|c| key.contains(c)) {
            return label.to_string();
        }
    }

    let is_camera = AMBIGUOUS_CAMERA.contains(&key.as_str());
    let is_radar = AMBIGUOUS_RADAR.contains(&key.as_str());
    if is_camera || is_radar {
        if let Some(label) = resolve_ambiguous(is_camera, operation_hint) {
            return label.to_string();
        }
    }

    display_form(name)
}

fn resolve_ambiguous(is_camera: bool, operation_hint: Option<&str>) -> Option<&'static str> {
    let hint = operation_hint.map(normalize_key).unwrap_or_default();
    let has = |words: &[&str]| words.iter().any(|w| hint.contains(w));

    if has(&["align", "steering", "suspension", "tierod", "knuckle"]) {
        return Some(STEERING_ANGLE_SENSOR);
    }
    if has(&["windshield", "windscreen", "glass"]) {
        return Some(FORWARD_CAMERA);
    }
    if has(&["mirror"]) {
        return Some(if is_camera { SURROUND_VIEW } else { BLIND_SPOT });
    }
    if has(&["rearbumper", "liftgate", "tailgate", "trunk", "quarter", "decklid"]) {
        return Some(if is_camera { REAR_CAMERA } else { BLIND_SPOT });
    }
    if has(&["bumper", "grille"]) {
        return Some(if is_camera { SURROUND_VIEW } else { FRONT_RADAR });
    }
    if hint.is_empty() || is_camera || has(&["radar", "sensor"]) {
        return Some(if is_camera { FORWARD_CAMERA } else { FRONT_RADAR });
    }
    None
}

/// Collapse whitespace and capitalize lowercase words, leaving acronyms.
fn display_form(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            if word.chars().any(|c| c.is_lowercase()) {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// The operation recommended for a canonical system label.
pub fn recommended_operation(system_label: &str) -> String {
    match system_label {
        STEERING_ANGLE_SENSOR => format!("{STEERING_ANGLE_SENSOR} Reset"),
        HEADLAMP_AIMING => HEADLAMP_AIMING.to_string(),
        "" => String::new(),
        other => format!("{other} Calibration"),
    }
}

/// Canonical display form of an operation name.
///
/// Operation words ("calibration", "reset", "aim", ...) are peeled off
/// both ends, the remaining system part is canonicalized, and the
/// system's recommended operation is returned.
pub fn canonical_operation_name(operation: &str) -> String {
    let words: Vec<&str> = operation
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/' || c == '_')
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect();

    let is_op_word = |w: &&str| OPERATION_WORDS.contains(&normalize_key(w).as_str());
    let start = words.iter().position(|w| !is_op_word(w));
    let end = words.iter().rposition(|w| !is_op_word(w));

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ => return display_form(operation),
    };

    let system = canonical_system_name(&words[start..=end].join(" "), None);
    recommended_operation(&system)
}

/// Grouping key for matches on `system_name` triggered by `repair_operation`.
pub fn operation_key(system_name: &str, repair_operation: &str) -> String {
    let label = canonical_system_name(system_name, Some(repair_operation));
    normalize_key(&canonical_operation_name(&recommended_operation(&label)))
}

/// The calibration-type vocabulary.
pub const CALIBRATION_TYPES: &[&str] = &[
    "Static",
    "Dynamic",
    "Static + Dynamic",
    "Self-Calibrating",
    "Reset",
    "Aiming",
    "Verification",
    "Other",
];

/// Map a calibration-type string onto [`CALIBRATION_TYPES`].
///
/// Blank input yields `None`.
pub fn canonical_calibration_type(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let has = |s: &str| lower.contains(s);
    let label = if has("static") && has("dynamic") {
        "Static + Dynamic"
    } else if has("static") {
        "Static"
    } else if has("dynamic") || has("on-road") || has("drive cycle") {
        "Dynamic"
    } else if has("self") || has("automatic") {
        "Self-Calibrating"
    } else if has("reset") || has("relearn") || has("initiali") || has("zero point") {
        "Reset"
    } else if has("aim") {
        "Aiming"
    } else if has("verif") || has("check") || has("scan") {
        "Verification"
    } else {
        "Other"
    };
    Some(label.to_string())
}

/// Merge calibration types: distinct canonical types, first-seen order.
///
/// Inputs that are themselves merged strings are split on `separator`
/// first, so merging is stable under re-merging.
pub fn merge_calibration_types<'a, I>(types: I, separator: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    for raw in types {
        let parts: Vec<&str> = if separator.is_empty() {
            vec![raw]
        } else {
            raw.split(separator).collect()
        };
        for part in parts {
            if let Some(t) = canonical_calibration_type(part) {
                if !seen.contains(&t) {
                    seen.push(t);
                }
            }
        }
    }
    if seen.is_empty() {
        None
    } else {
        Some(seen.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_SAMPLES: &[&str] = &[
        "SAS",
        "Steering angle sensor",
        "steering-angle sensor (SAS)",
        "Forward Facing Camera",
        "Lane Departure Warning",
        "EyeSight",
        "Front radar",
        "Adaptive Cruise Control",
        "Millimeter Wave Radar Sensor",
        "Blind Spot Monitor",
        "Rear Cross Traffic Alert",
        "360 Camera",
        "Backup camera",
        "Park Assist Sensors",
        "Headlamp",
        "Night Vision",
        "camera",
        "radar",
        "ACC module",
        "  pre-collision   system ",
    ];

    #[test]
    fn normalize_key_strips_variance() {
        assert_eq!(normalize_key("Front Radar"), "frontradar");
        assert_eq!(normalize_key("front-radar!!"), "frontradar");
        assert_eq!(normalize_key("R&I Bumper"), "randibumper");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn system_aliases_merge() {
        assert_eq!(canonical_system_name("SAS", None), STEERING_ANGLE_SENSOR);
        assert_eq!(canonical_system_name("steering angle sensor", None), STEERING_ANGLE_SENSOR);
        assert_eq!(canonical_system_name("Lane Departure Warning", None), FORWARD_CAMERA);
        assert_eq!(canonical_system_name("Adaptive Cruise Control", None), FRONT_RADAR);
        assert_eq!(canonical_system_name("ACC", None), FRONT_RADAR);
        assert_eq!(canonical_system_name("Rear Cross Traffic Alert", None), BLIND_SPOT);
        assert_eq!(canonical_system_name("Park Assist Sensors", None), PARKING_SENSORS);
    }

    #[test]
    fn ambiguous_names_use_operation_hint() {
        assert_eq!(canonical_system_name("Camera", Some("Windshield Replacement")), FORWARD_CAMERA);
        assert_eq!(canonical_system_name("Camera", Some("Rear bumper R&R")), REAR_CAMERA);
        assert_eq!(canonical_system_name("Radar", Some("Rear Bumper R&R")), BLIND_SPOT);
        assert_eq!(canonical_system_name("Radar", Some("Front Bumper Overhaul")), FRONT_RADAR);
        assert_eq!(canonical_system_name("Camera", Some("Mirror replacement")), SURROUND_VIEW);
        assert_eq!(canonical_system_name("Sensor", Some("Wheel alignment")), STEERING_ANGLE_SENSOR);
        assert_eq!(canonical_system_name("camera", None), FORWARD_CAMERA);
    }

    #[test]
    fn unknown_systems_get_display_form() {
        assert_eq!(canonical_system_name("  pre-collision   system ", None), "Pre-collision System");
        assert_eq!(canonical_system_name("ACC module", None), FRONT_RADAR);
        assert_eq!(canonical_system_name("HUD unit", None), "HUD Unit");
        assert_eq!(canonical_system_name("", None), "");
    }

    #[test]
    fn system_canonicalization_is_idempotent() {
        for hint in [None, Some("Windshield Replacement"), Some("Rear Bumper R&R")] {
            for s in SYSTEM_SAMPLES {
                let once = canonical_system_name(s, hint);
                assert_eq!(canonical_system_name(&once, hint), once, "input {s:?}");
            }
        }
    }

    #[test]
    fn operation_names() {
        assert_eq!(canonical_operation_name("SAS reset"), "Steering Angle Sensor Reset");
        assert_eq!(
            canonical_operation_name("Calibrate steering angle sensor"),
            "Steering Angle Sensor Reset"
        );
        assert_eq!(canonical_operation_name("front radar aim"), "Front Radar Calibration");
        assert_eq!(canonical_operation_name("Headlamp aim"), "Headlamp Aiming");
        assert_eq!(canonical_operation_name("Static calibration"), "Static Calibration");
        assert_eq!(canonical_operation_name("Static + Dynamic"), "Static + Dynamic");
        assert_eq!(canonical_operation_name("Front radar + calibration"), "Front Radar Calibration");
    }

    #[test]
    fn operation_canonicalization_is_idempotent() {
        let samples = [
            "SAS reset",
            "Forward camera static calibration",
            "Headlamp aiming check",
            "calibration",
            "HUD unit recalibration",
            "Aim Sensor Calibration",
        ];
        for s in samples {
            let once = canonical_operation_name(s);
            assert_eq!(canonical_operation_name(&once), once, "input {s:?}");
        }
        for s in SYSTEM_SAMPLES {
            let once = canonical_operation_name(s);
            assert_eq!(canonical_operation_name(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn equivalent_phrasings_share_a_key() {
        let a = operation_key("SAS", "Alignment");
        let b = operation_key("Steering Angle Sensor", "Subframe R&I");
        let c = operation_key("steering-angle sensor", "Suspension");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, operation_key("Front Radar", "Front Bumper"));
    }

    #[test]
    fn calibration_types() {
        assert_eq!(canonical_calibration_type("STATIC"), Some("Static".to_string()));
        assert_eq!(canonical_calibration_type("Dynamic (on-road)"), Some("Dynamic".to_string()));
        assert_eq!(
            canonical_calibration_type("static and dynamic"),
            Some("Static + Dynamic".to_string())
        );
        assert_eq!(canonical_calibration_type("Zero point reset"), Some("Reset".to_string()));
        assert_eq!(canonical_calibration_type("Aim"), Some("Aiming".to_string()));
        assert_eq!(canonical_calibration_type("self calibrating"), Some("Self-Calibrating".to_string()));
        assert_eq!(canonical_calibration_type("Post-scan verify"), Some("Verification".to_string()));
        assert_eq!(canonical_calibration_type("mystery"), Some("Other".to_string()));
        assert_eq!(canonical_calibration_type("   "), None);
    }

    #[test]
    fn calibration_type_canonicalization_is_idempotent() {
        for s in ["static", "Dynamic", "static/dynamic", "relearn", "aim", "auto", "check", "x"] {
            let once = canonical_calibration_type(s).unwrap_or_default();
            assert_eq!(canonical_calibration_type(&once), Some(once.clone()));
        }
    }

    #[test]
    fn canonical_types_stay_in_vocabulary() {
        for s in ["static", "on-road drive", "static and dynamic", "relearn", "aim", "auto", "scan", "x"] {
            let t = canonical_calibration_type(s).unwrap_or_default();
            assert!(CALIBRATION_TYPES.contains(&t.as_str()), "{s:?} gave {t:?}");
        }
    }

    #[test]
    fn merge_types_first_seen() {
        let merged = merge_calibration_types(["Dynamic", "static", "DYNAMIC", ""], "/");
        assert_eq!(merged.as_deref(), Some("Dynamic/Static"));
        let again = merge_calibration_types([merged.as_deref().unwrap_or(""), "Reset"], "/");
        assert_eq!(again.as_deref(), Some("Dynamic/Static/Reset"));
        assert_eq!(merge_calibration_types(Vec::<&str>::new(), "/"), None);
    }
}
