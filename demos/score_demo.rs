//! Score a small synthetic cohort and run one intervention

use academic_instability::{evaluate_counterfactual, score_cohort, Intervention, StudentRecord};

fn main() {
    let cohort = vec![
        StudentRecord::new(10.0, 90.0, 9.0),
        StudentRecord::new(5.0, 50.0, 5.0),
        StudentRecord::new(0.0, 10.0, 1.0),
        StudentRecord::new(6.5, 72.0, 7.0),
        StudentRecord::new(3.0, 61.0, 4.0),
    ];

    let scored = match score_cohort(&cohort) {
        Ok(scored) => scored,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    for r in scored.iter() {
        println!("{} | instability {:.3}", r.label(), r.instability_index);
    }

    match evaluate_counterfactual(&scored, 2, Intervention::new(0.0, 30.0, 2.0)) {
        Ok(outcome) => println!("Δ instability for [2]: {:+.3}", outcome.instability_delta()),
        Err(e) => eprintln!("Error: {e}"),
    }
}
