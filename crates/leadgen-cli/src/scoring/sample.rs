use leadgen_classifiers::data_handling::{FieldValue, LeadRecord};

fn bank_lead(indicators: [&str; 4]) -> LeadRecord {
    let mut lead: LeadRecord = [
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
    ]
    .into_iter()
    .collect();
    for (field, value) in [("age", 35), ("duration", 180), ("campaign", 2), ("pdays", 999), ("previous", 0)] {
        lead.insert(field, FieldValue::Integer(value));
    }
    let [emp_var_rate, cons_price_idx, cons_conf_idx, nr_employed] = indicators;
    lead.insert(emp_var_rate, -1.8);
    lead.insert(cons_price_idx, 92.89);
    lead.insert(cons_conf_idx, -46.2);
    lead.insert("euribor3m", 1.3);
    lead.insert(nr_employed, 5099.1);
    lead
}

/// Static bank payload in request spelling.
pub fn sample_lead() -> LeadRecord {
    bank_lead(["emp_var_rate", "cons_price_idx", "cons_conf_idx", "nr_employed"])
}

/// Default comparison payload, in the bank dataset's dot spelling.
pub fn comparison_sample() -> LeadRecord {
    bank_lead(["emp.var.rate", "cons.price.idx", "cons.conf.idx", "nr.employed"])
}
