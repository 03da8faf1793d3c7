// Energy scoring (non-consensus, audit only).
// energy(tx) = si_byte_value(len) + binary_byte_value(len) + hash_fraction(digest)
// where len is the canonical encoding length. Both magnitude terms are taken
// against the reference tier of their table and therefore collapse to len.

use crate::codec::encode_transaction;
use crate::digest::{Hash, sha256};
use crate::tx::Transaction;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiUnit {
    pub name: &'static str,
    pub symbol: &'static str,
    pub scale: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryUnit {
    pub name: &'static str,
    pub symbol: &'static str,
    pub power2: u32,
}

impl BinaryUnit {
    pub fn scale(&self) -> f64 {
        2f64.powi(self.power2 as i32)
    }
}

const fn si(name: &'static str, symbol: &'static str, scale: f64) -> SiUnit {
    SiUnit { name, symbol, scale }
}

const fn bin(name: &'static str, symbol: &'static str, power2: u32) -> BinaryUnit {
    BinaryUnit { name, symbol, power2 }
}

pub const SI_BYTE_UNITS: [SiUnit; 24] = [
    si("Quecto", "qB", 1e-30),
    si("Ronto", "rB", 1e-27),
    si("Yocto", "yB", 1e-24),
    si("Zepto", "zB", 1e-21),
    si("Atto", "aB", 1e-18),
    si("Femto", "fB", 1e-15),
    si("Pico", "pB", 1e-12),
    si("Nano", "nB", 1e-9),
    si("Mikro", "µB", 1e-6),
    si("Milli", "mB", 1e-3),
    si("Zenti", "cB", 1e-2),
    si("Dezi", "dB", 1e-1),
    si("Byte", "B", 1e0),
    si("Deka", "daB", 1e1),
    si("Hekto", "hB", 1e2),
    si("Kilo", "kB", 1e3),
    si("Mega", "MB", 1e6),
    si("Giga", "GB", 1e9),
    si("Tera", "TB", 1e12),
    si("Peta", "PB", 1e15),
    si("Exa", "EB", 1e18),
    si("Zetta", "ZB", 1e21),
    si("Yotta", "YB", 1e24),
    si("Quetta", "QB", 1e30),
];

pub const BINARY_BYTE_UNITS: [BinaryUnit; 24] = [
    bin("Quectibyte", "QiB", 0),
    bin("Rontibyte", "RiB", 10),
    bin("Yoctibyte", "YiB", 20),
    bin("Zeptibyte", "ZiB", 30),
    bin("Attibyte", "AiB", 40),
    bin("Femtoibyte", "FiB", 50),
    bin("Picoibyte", "PiB", 60),
    bin("Nanoibyte", "NiB", 70),
    bin("Microibyte", "µiB", 80),
    bin("Millibyte", "miB", 90),
    bin("Centibyte", "ciB", 100),
    bin("Decibyte", "diB", 110),
    bin("Byte", "B", 120),
    bin("Dekibyte", "daiB", 130),
    bin("Hektibyte", "hiB", 140),
    bin("Kilobibyte", "KiB", 150),
    bin("Megabibyte", "MiB", 160),
    bin("Gigabibyte", "GiB", 170),
    bin("Terabibyte", "TiB", 180),
    bin("Petabibyte", "PiBiB", 190),
    bin("Exbibibyte", "EiBiB", 200),
    bin("Zebbibyte", "ZiBiB", 210),
    bin("Yobbibyte", "YiBiB", 220),
    bin("Quettibyte", "QiBiB", 230),
];

/// Reference tier of the SI table: the unit of scale 1.
const SI_REFERENCE: usize = 12;
/// Reference tier of the binary table: the unit of scale 2^0.
const BINARY_REFERENCE: usize = 0;

const FRACTION_MODULUS: u64 = 1_000_000_000;

pub fn si_byte_value(len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    len as f64 / SI_BYTE_UNITS[SI_REFERENCE].scale
}

pub fn binary_byte_value(len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    len as f64 / BINARY_BYTE_UNITS[BINARY_REFERENCE].scale()
}

/// Last 8 digest bytes, big-endian, reduced mod 1e9 into [0, 1).
pub fn hash_fraction(digest: &Hash) -> f64 {
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&digest[24..32]);
    (u64::from_be_bytes(tail) % FRACTION_MODULUS) as f64 / FRACTION_MODULUS as f64
}

pub fn energy_of_bytes(bytes: &[u8]) -> f64 {
    si_byte_value(bytes.len()) + binary_byte_value(bytes.len()) + hash_fraction(&sha256(bytes))
}

pub fn compute_energy(tx: &Transaction) -> f64 {
    energy_of_bytes(&encode_transaction(tx))
}

/// Largest SI unit in which `len` reads as at least one, for display.
pub fn best_fit_si(len: usize) -> (SiUnit, f64) {
    let len = len as f64;
    let unit = SI_BYTE_UNITS[SI_REFERENCE..]
        .iter()
        .rev()
        .find(|u| len / u.scale >= 1.0)
        .copied()
        .unwrap_or(SI_BYTE_UNITS[SI_REFERENCE]);
    (unit, len / unit.scale)
}

pub fn best_fit_binary(len: usize) -> (BinaryUnit, f64) {
    let len = len as f64;
    let unit = BINARY_BYTE_UNITS
        .iter()
        .rev()
        .find(|u| len / u.scale() >= 1.0)
        .copied()
        .unwrap_or(BINARY_BYTE_UNITS[BINARY_REFERENCE]);
    (unit, len / unit.scale())
}

/// Portion of a core token's energy bound to it versus released as reward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergySplit {
    pub bound: f64,
    pub reward: f64,
}

impl EnergySplit {
    pub fn new(energy: f64, binding_factor: f64) -> Self {
        EnergySplit {
            bound: energy * binding_factor,
            reward: energy * (1.0 - binding_factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::build_transfer;

    #[test]
    fn magnitude_terms_collapse_to_length() {
        for len in [1usize, 19, 64, 4096] {
            assert_eq!(si_byte_value(len), len as f64);
            assert_eq!(binary_byte_value(len), len as f64);
        }
        assert_eq!(si_byte_value(0), 0.0);
        assert_eq!(binary_byte_value(0), 0.0);
    }

    #[test]
    fn reference_rows_are_unit_scale() {
        assert_eq!(SI_BYTE_UNITS[SI_REFERENCE].name, "Byte");
        assert_eq!(SI_BYTE_UNITS[SI_REFERENCE].scale, 1.0);
        assert_eq!(BINARY_BYTE_UNITS[BINARY_REFERENCE].scale(), 1.0);
    }

    #[test]
    fn fraction_in_unit_interval() {
        assert_eq!(hash_fraction(&[0u8; 32]), 0.0);
        let f = hash_fraction(&[0xffu8; 32]);
        assert!((0.0..1.0).contains(&f));
        // u64::MAX mod 1e9 = 709551615
        assert_eq!(f, 709_551_615.0 / 1e9);
    }

    #[test]
    fn energy_is_length_twice_plus_fraction() {
        let tx = build_transfer("W1", "W2", 40.0, 0, "");
        let len = encode_transaction(&tx).len();
        let e = compute_energy(&tx);
        let frac = e - 2.0 * len as f64;
        assert!((0.0..1.0).contains(&frac));
        assert_eq!(e, compute_energy(&tx));
    }

    #[test]
    fn best_fit_picks_largest_readable_unit() {
        let (u, v) = best_fit_si(2_500);
        assert_eq!(u.symbol, "kB");
        assert_eq!(v, 2.5);
        let (u, _) = best_fit_si(0);
        assert_eq!(u.symbol, "B");
        let (u, v) = best_fit_binary(2048);
        assert_eq!(u.symbol, "RiB");
        assert_eq!(v, 2.0);
    }

    #[test]
    fn split_follows_binding_factor() {
        let s = EnergySplit::new(100.0, 0.75);
        assert_eq!(s.bound, 75.0);
        assert_eq!(s.reward, 25.0);
    }
}
