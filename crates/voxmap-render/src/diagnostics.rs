//! Per-run tallies of ids and records that could not be rendered faithfully.
//!
//! Each scan or render pass owns a [`Diagnostics`] value and returns it; the
//! session merges them once every pass has finished, so parallel passes never
//! share counters.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::metadata::MetadataTables;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Block ids outside `0..1024` seen in block data.
    pub invalid_block_ids: BTreeMap<u16, u64>,
    /// Block ids with no table entry.
    pub unknown_block_ids: BTreeMap<u16, u64>,
    /// `(id, data)` pairs whose data matched no color variant.
    pub unmatched_variants: BTreeMap<(u16, u8), u64>,
    /// Biome ids with no table entry.
    pub unknown_biomes: BTreeMap<u8, u64>,
    /// Palette block names no table entry matches.
    pub unresolved_names: BTreeMap<String, u64>,
    /// Known blocks rendered without an assigned color.
    pub needs_color: BTreeMap<u16, u64>,
    /// Block records that failed to decode.
    pub decode_errors: u64,
}

fn bump<K: Ord>(map: &mut BTreeMap<K, u64>, key: K) {
    *map.entry(key).or_insert(0) += 1;
}

fn merge_counts<K: Ord>(into: &mut BTreeMap<K, u64>, from: BTreeMap<K, u64>) {
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
}

impl Diagnostics {
    pub fn record_invalid_block(&mut self, id: u16) {
        bump(&mut self.invalid_block_ids, id);
    }

    pub fn record_unknown_block(&mut self, id: u16) {
        bump(&mut self.unknown_block_ids, id);
    }

    pub fn record_unmatched_variant(&mut self, id: u16, data: u8) {
        bump(&mut self.unmatched_variants, (id, data));
    }

    pub fn record_unknown_biome(&mut self, id: u8) {
        bump(&mut self.unknown_biomes, id);
    }

    pub fn record_unresolved_name(&mut self, name: &str) {
        if let Some(count) = self.unresolved_names.get_mut(name) {
            *count += 1;
        } else {
            self.unresolved_names.insert(name.to_string(), 1);
        }
    }

    pub fn record_needs_color(&mut self, id: u16) {
        bump(&mut self.needs_color, id);
    }

    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    /// Folds another pass's tallies into this one.
    pub fn merge(&mut self, other: Diagnostics) {
        merge_counts(&mut self.invalid_block_ids, other.invalid_block_ids);
        merge_counts(&mut self.unknown_block_ids, other.unknown_block_ids);
        merge_counts(&mut self.unmatched_variants, other.unmatched_variants);
        merge_counts(&mut self.unknown_biomes, other.unknown_biomes);
        merge_counts(&mut self.unresolved_names, other.unresolved_names);
        merge_counts(&mut self.needs_color, other.needs_color);
        self.decode_errors += other.decode_errors;
    }

    pub fn is_clean(&self) -> bool {
        *self == Diagnostics::default()
    }

    /// Writes a human-readable report section.
    pub fn write_summary(&self, out: &mut dyn Write, tables: &MetadataTables) -> io::Result<()> {
        writeln!(out, "RENDER DIAGNOSTICS")?;
        if self.is_clean() {
            writeln!(out, "  (none)")?;
            return Ok(());
        }
        writeln!(out, "  decode errors: {}", self.decode_errors)?;
        for (id, count) in &self.invalid_block_ids {
            writeln!(out, "  invalid block id {id}: {count}")?;
        }
        for (id, count) in &self.unknown_block_ids {
            writeln!(out, "  unknown block id {id} (0x{id:x}): {count}")?;
        }
        for ((id, data), count) in &self.unmatched_variants {
            writeln!(
                out,
                "  unmatched variant {} ({id}) data {data}: {count}",
                tables.block_name(*id)
            )?;
        }
        for (id, count) in &self.unknown_biomes {
            writeln!(out, "  unknown biome id {id}: {count}")?;
        }
        for (name, count) in &self.unresolved_names {
            writeln!(out, "  unresolved block name '{name}': {count}")?;
        }
        for (id, count) in &self.needs_color {
            writeln!(out, "  needs color {} ({id}): {count}", tables.block_name(*id))?;
        }
        Ok(())
    }
}
