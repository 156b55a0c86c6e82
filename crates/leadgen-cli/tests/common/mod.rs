#![allow(dead_code)]
//! Data directories for service tests.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use leadgen_classifiers::data_handling::{DatasetVariant, LeadRecord};
use leadgen_cli::scoring::sample::sample_lead;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A compact bank source: a few profile columns, call duration and the
/// dotted economic indicators. Calls over 400 seconds convert.
pub fn write_bank_csv(dir: &Path, n: usize) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(23);
    let jobs = ["management", "technician", "services", "student"];
    let mut out = String::from(
        "age;job;marital;contact;duration;campaign;emp.var.rate;cons.price.idx;euribor3m;nr.employed;y\n",
    );
    for i in 0..n {
        let duration: u32 = rng.gen_range(20..800);
        let converted = duration > 400;
        writeln!(
            out,
            "{};\"{}\";\"{}\";\"{}\";{};{};{:.1};{:.3};{:.3};{:.1};\"{}\"",
            rng.gen_range(21..65),
            jobs.choose(&mut rng).unwrap(),
            if i % 2 == 0 { "married" } else { "single" },
            if rng.gen_bool(0.6) { "cellular" } else { "telephone" },
            duration,
            rng.gen_range(1..5),
            if converted { -1.8 } else { 1.4 },
            rng.gen_range(92.0..94.0),
            if converted { rng.gen_range(0.6..1.6) } else { rng.gen_range(1.4..4.9) },
            rng.gen_range(4990.0..5220.0),
            if converted { "yes" } else { "no" },
        )
        .unwrap();
    }
    let path = dir.join(DatasetVariant::Bank.source_file());
    fs::write(&path, out).unwrap();
    path
}

/// The service's own sample payload, as a client would send it.
pub fn bank_lead() -> LeadRecord {
    sample_lead()
}
