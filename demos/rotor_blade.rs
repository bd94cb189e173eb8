use blade_mdo::{run_study, Method, StudySettings, EXPORT_COLUMNS};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .compact()
        .init();

    let settings = StudySettings {
        seed: 1234,
        ..StudySettings::default()
    };
    let report = run_study(&settings)?;

    eprintln!(
        "{} GA candidates, {} Gradient candidates, {} archived Pareto designs, {} of {} trials converged",
        report.results.by_method(Method::Evolutionary).count(),
        report.results.by_method(Method::Gradient).count(),
        report.evolutionary.archive.len(),
        report.gradient.trials.len() - report.gradient.non_converged(),
        report.gradient.trials.len(),
    );

    println!("{}", EXPORT_COLUMNS.join(","));
    for record in report.results.records() {
        println!("{}", record.fields().join(","));
    }
    Ok(())
}
