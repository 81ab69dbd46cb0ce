// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Fuzz user-entered quantities and dates, and the sheet row codec

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use reagent_inventory::ledger::{parse_date, parse_quantity};
use reagent_inventory::store::rows;

#[derive(Arbitrary, Debug)]
struct Input {
    quantity: String,
    date: String,
    cell: String,
    header: Vec<String>,
    grid: Vec<Vec<String>>,
}

fuzz_target!(|input: Input| {
    if let Ok(q) = parse_quantity(&input.quantity) {
        assert!(q.is_finite() && q > 0.0);
    }
    let _ = parse_date(&input.date);
    let _ = rows::parse_cell_date(&input.cell);
    let _ = rows::parse_cell_time(&input.cell);

    // Decoded rows must re-encode and decode to the same records
    if let Ok(reagents) = rows::decode_reagents(&input.header, &input.grid) {
        let encoded: Vec<Vec<String>> = reagents.iter().map(rows::reagent_to_cells).collect();
        let again = rows::decode_reagents(&rows::inventory_header(), &encoded)
            .expect("encoded reagents must decode");
        assert_eq!(again.len(), reagents.len());
    }
    let _ = rows::decode_movements(&input.header, &input.grid);
});
