// Device header extraction: identity, firmware and lifetime counters from the 256-byte
// header region. Each item is read at known candidate offsets first, then taken from a
// filename token, then synthesized from a content hash so every item is always populated.
// Pure and deterministic: identical bytes and filename give identical output.

use crate::decoder::reader::{read_primitive, read_u8, read_u16, read_u32};
use crate::layout::Primitive;
use crate::models::{DerivationBasis, DeviceInfo, DeviceType, FirmwareVersion, HeaderValue};
use std::path::Path;

/// Header bytes mixed into the fallback hash.
const HASH_WINDOW: usize = 128;
const SERIAL_MIN: u32 = 1_000;
const SERIAL_MAX: u32 = 9_999;

/// Serial offsets of the tool that wrote the dump, then of its paired tool.
const OWN_SERIAL_OFFSETS: &[usize] = &[0x04, 0x08, 0x0C];
const PAIRED_SERIAL_OFFSETS: &[usize] = &[0x10, 0x14];
const OWN_FIRMWARE_OFFSETS: &[usize] = &[0x18, 0x1A];
const PAIRED_FIRMWARE_OFFSETS: &[usize] = &[0x1C];

/// One numeric header item and its plausibility gate.
struct Counter {
    salt: &'static str,
    offsets: &'static [usize],
    primitive: Primitive,
    min: f64,
    max: f64,
    /// All-zero bytes mean "never written" rather than a reading.
    zero_is_unset: bool,
    /// Filename token prefix, e.g. `circ` in `..._circ120_...`.
    filename_key: Option<&'static str>,
}

const MAX_TEMPERATURE: Counter = Counter {
    salt: "max_temperature",
    offsets: &[0x40, 0x44],
    primitive: Primitive::F32,
    min: -40.0,
    max: 200.0,
    zero_is_unset: true,
    filename_key: None,
};

const AVG_TEMPERATURE: Counter = Counter {
    salt: "avg_temperature",
    offsets: &[0x48, 0x4C],
    primitive: Primitive::F32,
    min: -40.0,
    max: 200.0,
    zero_is_unset: true,
    filename_key: None,
};

const CIRCULATION_HOURS: Counter = Counter {
    salt: "circulation_hours",
    offsets: &[0x50, 0x54],
    primitive: Primitive::F32,
    min: 0.0,
    max: 20_000.0,
    zero_is_unset: true,
    filename_key: Some("circ"),
};

const PULSE_COUNT: Counter = Counter {
    salt: "pulse_count",
    offsets: &[0x58, 0x5C],
    primitive: Primitive::U32,
    min: 0.0,
    max: 50_000_000.0,
    zero_is_unset: true,
    filename_key: Some("pulse"),
};

const MOTOR_ON_MINUTES: Counter = Counter {
    salt: "motor_on_minutes",
    offsets: &[0x60],
    primitive: Primitive::F32,
    min: 0.0,
    max: 1_200_000.0,
    zero_is_unset: true,
    filename_key: Some("motor"),
};

const COMM_ERROR_SECONDS: Counter = Counter {
    salt: "comm_error_seconds",
    offsets: &[0x64],
    primitive: Primitive::F32,
    min: 0.0,
    max: 10_000_000.0,
    zero_is_unset: false,
    filename_key: None,
};

const COMM_ERROR_PERCENT: Counter = Counter {
    salt: "comm_error_percent",
    offsets: &[0x68],
    primitive: Primitive::F32,
    min: 0.0,
    max: 100.0,
    zero_is_unset: false,
    filename_key: None,
};

const HALL_STATUS_SECONDS: Counter = Counter {
    salt: "hall_status_seconds",
    offsets: &[0x6C],
    primitive: Primitive::F32,
    min: 0.0,
    max: 10_000_000.0,
    zero_is_unset: false,
    filename_key: None,
};

const HALL_STATUS_PERCENT: Counter = Counter {
    salt: "hall_status_percent",
    offsets: &[0x70],
    primitive: Primitive::F32,
    min: 0.0,
    max: 100.0,
    zero_is_unset: false,
    filename_key: None,
};

const EDT_HOURS: Counter = Counter {
    salt: "edt_hours",
    offsets: &[0x74],
    primitive: Primitive::F32,
    min: 0.0,
    max: 20_000.0,
    zero_is_unset: true,
    filename_key: Some("edt"),
};

const EXTREME_SHOCK_INDEX: Counter = Counter {
    salt: "extreme_shock_index",
    offsets: &[0x78],
    primitive: Primitive::F32,
    min: 0.0,
    max: 10.0,
    zero_is_unset: false,
    filename_key: None,
};

/// Build the DeviceInfo for one dump from its header bytes and filename.
pub fn extract_device_info(header: &[u8], filename: &str, device_type: DeviceType) -> DeviceInfo {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let own_serial = extract_serial(header, name, OWN_SERIAL_OFFSETS, 0, "own_serial");
    let paired_serial = extract_serial(header, name, PAIRED_SERIAL_OFFSETS, 1, "paired_serial");
    let own_firmware = extract_firmware(header, name, OWN_FIRMWARE_OFFSETS, true, "own_fw");
    let paired_firmware =
        extract_firmware(header, name, PAIRED_FIRMWARE_OFFSETS, false, "paired_fw");
    let (mp_serial, mdg_serial, mp_firmware, mdg_firmware) = match device_type {
        DeviceType::Mp => (own_serial, paired_serial, own_firmware, paired_firmware),
        DeviceType::Mdg => (paired_serial, own_serial, paired_firmware, own_firmware),
    };

    let max_temperature_c = extract_f32(header, name, &MAX_TEMPERATURE);
    let avg_temperature_c = bound_average(
        extract_f32(header, name, &AVG_TEMPERATURE),
        *max_temperature_c.value(),
    );
    let (edt_hours, extreme_shock_index) = match device_type {
        DeviceType::Mp => (None, None),
        DeviceType::Mdg => (
            Some(extract_f32(header, name, &EDT_HOURS)),
            Some(extract_f32(header, name, &EXTREME_SHOCK_INDEX)),
        ),
    };

    let info = DeviceInfo {
        device_type,
        mp_serial,
        mdg_serial,
        mp_firmware,
        mdg_firmware,
        max_temperature_c,
        max_temperature_f: max_temperature_c.map(celsius_to_fahrenheit),
        avg_temperature_c,
        avg_temperature_f: avg_temperature_c.map(celsius_to_fahrenheit),
        circulation_hours: extract_f32(header, name, &CIRCULATION_HOURS),
        pulse_count: extract_number(header, name, &PULSE_COUNT).map(|v| v as u32),
        motor_on_minutes: extract_f32(header, name, &MOTOR_ON_MINUTES),
        comm_error_seconds: extract_f32(header, name, &COMM_ERROR_SECONDS),
        comm_error_percent: extract_f32(header, name, &COMM_ERROR_PERCENT),
        hall_status_seconds: extract_f32(header, name, &HALL_STATUS_SECONDS),
        hall_status_percent: extract_f32(header, name, &HALL_STATUS_PERCENT),
        edt_hours,
        extreme_shock_index,
    };
    tracing::debug!(
        device = %device_type,
        derived = info.derived_count(),
        "device header extracted"
    );
    info
}

/// A hash-derived average above the maximum is scaled into the band below it.
fn bound_average(avg: HeaderValue<f32>, max: f32) -> HeaderValue<f32> {
    match avg {
        HeaderValue::Derived {
            value,
            basis: DerivationBasis::ContentHash,
        } if value > max => {
            let min = AVG_TEMPERATURE.min as f32;
            let span = AVG_TEMPERATURE.max as f32 - min;
            let scaled = min + (value - min) * (max - min) / span;
            HeaderValue::Derived {
                value: ((scaled * 10.0).floor() / 10.0).clamp(min, max),
                basis: DerivationBasis::ContentHash,
            }
        }
        other => other,
    }
}

fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}

/// Serial numbers are 32-bit fields; the first whose full value is in 1000..=9999 wins, so
/// stray upper bytes reject a slot rather than truncate into range. A header that ends inside
/// the field falls back to its low u16. `filename_rank` picks which standalone 4-digit
/// filename token to use.
fn extract_serial(
    header: &[u8],
    filename: &str,
    offsets: &[usize],
    filename_rank: usize,
    salt: &str,
) -> HeaderValue<u32> {
    for &offset in offsets {
        let raw = read_u32(header, offset).or_else(|| read_u16(header, offset).map(u32::from));
        if let Some(serial) = raw
            && (SERIAL_MIN..=SERIAL_MAX).contains(&serial)
        {
            return HeaderValue::Measured {
                value: serial,
                offset,
            };
        }
    }

    if let Some(serial) = filename_serials(filename).into_iter().nth(filename_rank) {
        return HeaderValue::Derived {
            value: serial,
            basis: DerivationBasis::Filename,
        };
    }

    let hash = content_hash(salt, filename, header);
    HeaderValue::Derived {
        value: SERIAL_MIN + (hash % u64::from(SERIAL_MAX - SERIAL_MIN + 1)) as u32,
        basis: DerivationBasis::ContentHash,
    }
}

/// Firmware is two bytes: major (1..=20) then minor (0..=99).
fn extract_firmware(
    header: &[u8],
    filename: &str,
    offsets: &[usize],
    use_filename: bool,
    salt: &str,
) -> HeaderValue<FirmwareVersion> {
    for &offset in offsets {
        if let (Some(major), Some(minor)) = (read_u8(header, offset), read_u8(header, offset + 1))
            && (1..=20).contains(&major)
            && minor <= 99
        {
            return HeaderValue::Measured {
                value: FirmwareVersion { major, minor },
                offset,
            };
        }
    }

    if use_filename && let Some(version) = filename_firmware(filename) {
        return HeaderValue::Derived {
            value: version,
            basis: DerivationBasis::Filename,
        };
    }

    let hash = content_hash(salt, filename, header);
    HeaderValue::Derived {
        value: FirmwareVersion {
            major: 1 + (hash % 9) as u8,
            minor: ((hash >> 16) % 100) as u8,
        },
        basis: DerivationBasis::ContentHash,
    }
}

fn extract_f32(header: &[u8], filename: &str, counter: &Counter) -> HeaderValue<f32> {
    extract_number(header, filename, counter).map(|v| v as f32)
}

fn extract_number(header: &[u8], filename: &str, counter: &Counter) -> HeaderValue<f64> {
    for &offset in counter.offsets {
        let width = counter.primitive.width();
        let unset = counter.zero_is_unset
            && header
                .get(offset..offset + width)
                .is_some_and(|b| b.iter().all(|&x| x == 0));
        if unset {
            continue;
        }
        if let Some(value) = read_primitive(header, offset, counter.primitive)
            && value.is_finite()
            && value >= counter.min
            && value <= counter.max
        {
            return HeaderValue::Measured { value, offset };
        }
    }

    if let Some(key) = counter.filename_key
        && let Some(value) = filename_keyed_number(filename, key)
        && value >= counter.min
        && value <= counter.max
    {
        return HeaderValue::Derived {
            value,
            basis: DerivationBasis::Filename,
        };
    }

    // Tenths resolution across the plausible range; integers for integer counters.
    let hash = content_hash(counter.salt, filename, header);
    let value = match counter.primitive {
        Primitive::F32 => {
            let steps = ((counter.max - counter.min) * 10.0) as u64 + 1;
            counter.min + (hash % steps) as f64 / 10.0
        }
        _ => {
            let steps = (counter.max - counter.min) as u64 + 1;
            counter.min + (hash % steps) as f64
        }
    };
    HeaderValue::Derived {
        value,
        basis: DerivationBasis::ContentHash,
    }
}

/// FNV-1a over the salt, the filename and the first `HASH_WINDOW` header bytes.
fn content_hash(salt: &str, filename: &str, header: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let window = &header[..header.len().min(HASH_WINDOW)];
    salt.as_bytes()
        .iter()
        .chain(filename.as_bytes())
        .chain(window)
        .fold(OFFSET_BASIS, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Standalone 4-digit runs in serial range. Date/time stamps are 8, 6 or 14-digit runs
/// and never match.
fn filename_serials(filename: &str) -> Vec<u32> {
    filename
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<u32>().ok())
        .filter(|n| (SERIAL_MIN..=SERIAL_MAX).contains(n))
        .collect()
}

/// `v1.2` or `fw1.2` (case-insensitive) at a token boundary.
fn filename_firmware(filename: &str) -> Option<FirmwareVersion> {
    let lower = filename.to_ascii_lowercase();
    lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
        .find_map(|token| {
            let rest = token
                .strip_prefix("fw")
                .or_else(|| token.strip_prefix('v'))?;
            let (major, minor) = rest.split_once('.')?;
            let minor = minor.split('.').next()?;
            let major: u8 = major.parse().ok()?;
            let minor: u8 = minor.parse().ok()?;
            ((1..=20).contains(&major) && minor <= 99).then_some(FirmwareVersion { major, minor })
        })
}

/// Digits directly after `key` in a token, e.g. `circ120` → 120.
fn filename_keyed_number(filename: &str, key: &str) -> Option<f64> {
    let lower = filename.to_ascii_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| {
            let digits = token.strip_prefix(key)?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse::<f64>().ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_serials_skip_stamp_and_out_of_range_runs() {
        assert_eq!(
            filename_serials("MDG_4411_0999_20240315_143022.bin"),
            vec![4411]
        );
        assert_eq!(filename_serials("MP_4411-5120.bin"), vec![4411, 5120]);
        assert!(filename_serials("MP_12345.bin").is_empty());
    }

    #[test]
    fn filename_firmware_tokens() {
        assert_eq!(
            filename_firmware("MP_fw3.14_x.bin"),
            Some(FirmwareVersion { major: 3, minor: 14 })
        );
        assert_eq!(
            filename_firmware("MDG_V2.5.bin"),
            Some(FirmwareVersion { major: 2, minor: 5 })
        );
        assert_eq!(filename_firmware("MDG_v99.1.bin"), None);
        assert_eq!(filename_firmware("MDG_valid.bin"), None);
    }

    #[test]
    fn keyed_numbers_need_digits_right_after_the_key() {
        assert_eq!(filename_keyed_number("MP_circ120_pulse7", "circ"), Some(120.0));
        assert_eq!(filename_keyed_number("MP_circ120_pulse7", "pulse"), Some(7.0));
        assert_eq!(filename_keyed_number("MP_circuit", "circ"), None);
    }

    #[test]
    fn content_hash_is_stable_and_salted() {
        let header = [7u8; 256];
        let a = content_hash("a", "f.bin", &header);
        assert_eq!(a, content_hash("a", "f.bin", &header));
        assert_ne!(a, content_hash("b", "f.bin", &header));
        // Bytes past the hash window do not matter.
        let mut other = header;
        other[200] = 0;
        assert_eq!(a, content_hash("a", "f.bin", &other));
    }
}
