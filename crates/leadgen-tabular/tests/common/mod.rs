#![allow(dead_code)]
//! Lead scoring source files for training tests.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use leadgen_classifiers::data_handling::DatasetVariant;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Lead scoring rows with gaps in the zero-filled and imputed columns.
pub fn write_lead_scoring_csv(dir: &Path, n: usize) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(11);
    let mut out = String::from(
        "Prospect ID,Lead Number,Lead Origin,Lead Source,TotalVisits,Total Time Spent on Website,\
         Page Views Per Visit,Last Activity,Converted\n",
    );
    let origins = ["API", "Landing Page Submission", "Lead Add Form"];
    let sources = ["Google", "Direct Traffic", "Olark Chat", "Reference"];
    let activities = ["Email Opened", "SMS Sent", "Page Visited on Website"];
    for i in 0..n {
        let time: u32 = rng.gen_range(0..2000);
        let converted = time > 900;
        let visits = if i % 10 == 0 { String::new() } else { rng.gen_range(0..15).to_string() };
        let views = if i % 13 == 0 {
            String::new()
        } else {
            format!("{:.2}", rng.gen_range(0.0..6.0))
        };
        let source = if i % 17 == 0 { "" } else { *sources.choose(&mut rng).unwrap() };
        writeln!(
            out,
            "id-{},{},{},{},{},{},{},{},{}",
            i,
            600000 + i,
            origins.choose(&mut rng).unwrap(),
            source,
            visits,
            time,
            views,
            if converted { "SMS Sent" } else { *activities.choose(&mut rng).unwrap() },
            u8::from(converted),
        )
        .unwrap();
    }
    let path = dir.join(DatasetVariant::LeadScoring.source_file());
    fs::write(&path, out).unwrap();
    path
}
