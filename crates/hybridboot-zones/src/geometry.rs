//! CHS geometry
//!
//! MBR entries carry both a linear block address and a packed
//! cylinder/head/sector triplet. The builder computes triplets from a chosen
//! geometry; the inspector works out which geometry a table was written with.

use crate::mbr::types::MbrEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest cylinder a CHS triplet can express
pub const MAX_CYLINDER: u32 = 1023;

/// Packed triplet written when CHS values are not used
pub const CHS_UNUSED: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Disk geometry: heads per cylinder, sectors per track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub heads: u32,
    pub sectors: u32,
}

impl Geometry {
    /// Geometry assumed when a table fits no candidate
    pub const FALLBACK: Geometry = Geometry {
        heads: 255,
        sectors: 63,
    };

    pub const fn new(heads: u32, sectors: u32) -> Self {
        Self { heads, sectors }
    }

    /// Sectors per cylinder
    pub fn cylinder_sectors(&self) -> u64 {
        self.heads as u64 * self.sectors as u64
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.heads, self.sectors)
    }
}

/// CHS (Cylinder-Head-Sector) address
///
/// Sectors are 1-based. The packed form stores the two high cylinder bits in
/// the top of the sector byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chs {
    pub cylinder: u32,
    pub head: u32,
    pub sector: u32,
}

impl Chs {
    /// Parse CHS address from 3 bytes
    ///
    /// Format:
    /// - Byte 0: Head (0-255)
    /// - Byte 1: Sector (bits 0-5) + Cylinder high (bits 6-7)
    /// - Byte 2: Cylinder low (bits 0-7)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let head = bytes[0] as u32;
        let sector = (bytes[1] & 0x3F) as u32;
        let cylinder = bytes[2] as u32 + (((bytes[1] & 0xC0) as u32) << 2);

        Self {
            cylinder,
            head,
            sector,
        }
    }

    /// Convert CHS to bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            self.head as u8,
            (self.sector + ((self.cylinder >> 8) << 6)) as u8,
            (self.cylinder & 0xFF) as u8,
        ]
    }
}

impl fmt::Display for Chs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cylinder, self.head, self.sector)
    }
}

/// CHS triplet for a linear sector address
///
/// Addresses past cylinder 1023 clamp to the last sector of cylinder 1023.
/// With `no_chs` the unused marker `ff ff ff` is returned.
pub fn offset_to_chs(lba: u32, geometry: Geometry, no_chs: bool) -> [u8; 3] {
    if no_chs {
        return CHS_UNUSED;
    }

    let Geometry { heads, sectors } = geometry;
    let mut chs = Chs {
        sector: lba % sectors + 1,
        head: (lba / sectors) % heads,
        cylinder: lba / (sectors * heads),
    };

    if chs.cylinder > MAX_CYLINDER {
        chs = Chs {
            cylinder: MAX_CYLINDER,
            head: heads - 1,
            sector: sectors,
        };
    }

    chs.to_bytes()
}

/// Linear sector address of a CHS triplet
pub fn chs_to_lba(chs: Chs, geometry: Geometry) -> u32 {
    chs.cylinder
        .wrapping_mul(geometry.heads)
        .wrapping_add(chs.head)
        .wrapping_mul(geometry.sectors)
        .wrapping_add(chs.sector)
        .wrapping_sub(1)
}

/// Result of [`guess_geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeometryGuess {
    pub geometry: Geometry,
    /// False when no candidate matched and [`Geometry::FALLBACK`] was used
    pub consistent: bool,
}

/// Does `chs` describe `lba` under `heads`/`sectors`?
///
/// For triplets at or past the cylinder limit the cylinder is inferred from
/// the linear address and must itself be past the limit.
fn reproduces(chs: Chs, lba: u32, heads: u32, sectors: u32) -> bool {
    if chs.head >= heads || chs.sector > sectors {
        return false;
    }

    let cylinder = if chs.cylinder >= MAX_CYLINDER {
        let implied = (lba.wrapping_add(1).wrapping_sub(chs.sector) / sectors)
            .wrapping_sub(chs.head)
            / heads;
        if implied < MAX_CYLINDER {
            return false;
        }
        implied
    } else {
        chs.cylinder
    };

    chs_to_lba(
        Chs {
            cylinder,
            ..chs
        },
        Geometry::new(heads, sectors),
    ) == lba
}

/// Find the geometry a set of MBR entries was written with
///
/// Candidates are tried from 63 sectors down to 1, and for each from 255 heads
/// down to 1; the first candidate under which every valid entry's start and
/// end triplets reproduce their linear addresses wins. At least one triplet
/// must have been checked.
pub fn guess_geometry(entries: &[MbrEntry]) -> GeometryGuess {
    for sectors in (1..=63u32).rev() {
        for heads in (1..=255u32).rev() {
            let mut checked = 0usize;
            let fits = entries.iter().filter(|e| e.valid).all(|e| {
                let ok = reproduces(e.start, e.start_lba, heads, sectors)
                    && reproduces(e.end, e.end_lba, heads, sectors);
                checked += 2;
                ok
            });

            if fits && checked > 0 {
                return GeometryGuess {
                    geometry: Geometry::new(heads, sectors),
                    consistent: true,
                };
            }
        }
    }

    GeometryGuess {
        geometry: Geometry::FALLBACK,
        consistent: false,
    }
}
