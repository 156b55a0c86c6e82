#![allow(dead_code)]
//! Synthetic source files for integration tests.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use leadgen_classifiers::data_handling::{DatasetVariant, FieldValue, LeadRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const JOBS: &[&str] = &["admin.", "technician", "management", "services", "retired"];
const MONTHS: &[&str] = &["may", "jun", "jul", "aug", "nov"];
const DAYS: &[&str] = &["mon", "tue", "wed", "thu", "fri"];

/// Bank marketing rows; long calls convert.
pub fn write_bank_csv(dir: &Path, n: usize) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(7);
    let mut out = String::from(
        "\"age\";\"job\";\"marital\";\"education\";\"default\";\"housing\";\"loan\";\"contact\";\
         \"month\";\"day_of_week\";\"duration\";\"campaign\";\"pdays\";\"previous\";\"poutcome\";\
         \"emp.var.rate\";\"cons.price.idx\";\"cons.conf.idx\";\"euribor3m\";\"nr.employed\";\"y\"\n",
    );
    for i in 0..n {
        let duration: u32 = rng.gen_range(30..900);
        let converted = duration > 450;
        let job = JOBS.choose(&mut rng).unwrap();
        let marital = if i % 3 == 0 { "single" } else { "married" };
        let education = if rng.gen_bool(0.5) { "tertiary" } else { "secondary" };
        let month = MONTHS.choose(&mut rng).unwrap();
        let day = DAYS.choose(&mut rng).unwrap();
        let euribor = if converted { rng.gen_range(0.6..1.5) } else { rng.gen_range(1.2..5.0) };
        writeln!(
            out,
            "{};\"{}\";\"{}\";\"{}\";\"no\";\"{}\";\"no\";\"{}\";\"{}\";\"{}\";{};{};999;{};\"{}\";{:.1};{:.3};{:.1};{:.3};{:.1};\"{}\"",
            rng.gen_range(20..70),
            job,
            marital,
            education,
            if rng.gen_bool(0.5) { "yes" } else { "no" },
            if rng.gen_bool(0.7) { "cellular" } else { "telephone" },
            month,
            day,
            duration,
            rng.gen_range(1..6),
            rng.gen_range(0..2),
            if converted { "success" } else { "nonexistent" },
            if converted { -1.8 } else { 1.1 },
            rng.gen_range(92.0..94.5),
            rng.gen_range(-50.0..-30.0),
            euribor,
            rng.gen_range(4960.0..5230.0),
            if converted { "yes" } else { "no" },
        )
        .unwrap();
    }
    let path = dir.join(DatasetVariant::Bank.source_file());
    fs::write(&path, out).unwrap();
    path
}

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

/// The static bank payload served by the sample endpoint.
pub fn bank_sample() -> LeadRecord {
    let mut r = LeadRecord::new();
    r.insert("age", 35i64);
    for (k, v) in [
        ("job", "management"),
        ("marital", "married"),
        ("education", "tertiary"),
        ("default", "no"),
        ("housing", "yes"),
        ("loan", "no"),
        ("contact", "cellular"),
        ("month", "may"),
        ("day_of_week", "mon"),
        ("poutcome", "nonexistent"),
    ] {
        r.insert(k, v);
    }
    r.insert("duration", 180i64);
    r.insert("campaign", 2i64);
    r.insert("pdays", 999i64);
    r.insert("previous", 0i64);
    r.insert("emp_var_rate", FieldValue::Float(-1.8));
    r.insert("cons_price_idx", 92.89);
    r.insert("cons_conf_idx", -46.2);
    r.insert("euribor3m", 1.3);
    r.insert("nr_employed", 5099.1);
    r
}
