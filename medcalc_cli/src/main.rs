use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use medcalc_core::bmi::check_range;
use medcalc_core::session::{BMI_KEY, DOSE_KEY};
use medcalc_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "medcalc")]
#[command(about = "Clinical calculators and patient communication tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate BMI and the weight change needed to reach BMI 22
    Bmi {
        /// Height in cm (50-250)
        #[arg(long)]
        height: f64,

        /// Weight in kg (10-300)
        #[arg(long)]
        weight: f64,
    },

    /// Calculate a weight-based drug dose
    Dose {
        /// Patient weight in kg (1-200)
        #[arg(long)]
        weight: f64,

        /// Dose in mg per kg (0.1-100)
        #[arg(long)]
        dose_per_kg: f64,

        /// Administration frequency, e.g. "twice daily"
        #[arg(long, default_value = "once daily")]
        frequency: String,

        /// Drug name for the prescription summary
        #[arg(long)]
        drug: Option<String>,
    },

    /// Show averages over the patient vitals dataset
    Vitals {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Export the selected records as CSV (file or directory)
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print every record in the range
        #[arg(long)]
        show_records: bool,
    },

    /// Register a staff member, optionally polishing the introduction
    Staff {
        #[arg(long)]
        name: String,

        #[arg(long)]
        department: String,

        #[arg(long)]
        specialty: String,

        /// Introduction written by the staff member
        #[arg(long)]
        intro: String,

        /// Ask the text generation service for an improved introduction
        #[arg(long)]
        polish: bool,
    },

    /// Generate a guidance message for a patient
    Guidance {
        #[arg(long)]
        name: String,

        #[arg(long)]
        age: u32,

        #[arg(long)]
        diagnosis: String,

        #[arg(long)]
        symptoms: String,

        #[arg(long)]
        treatment: String,
    },

    /// Inspect or reset results retained in this session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the last BMI and dose results
    Show,
    /// Forget all retained results
    Clear,
}

const WEIGHT_RANGE_DOSE_KG: (f64, f64) = (1.0, 200.0);
const DOSE_PER_KG_RANGE_MG: (f64, f64) = (0.1, 100.0);

fn main() -> Result<()> {
    // Initialize logging
    medcalc_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let session_path = data_dir.join("session.json");
    tracing::debug!("Using session file {:?}", session_path);

    match cli.command {
        Commands::Bmi { height, weight } => cmd_bmi(&session_path, height, weight),
        Commands::Dose {
            weight,
            dose_per_kg,
            frequency,
            drug,
        } => cmd_dose(
            &session_path,
            &config,
            weight,
            dose_per_kg,
            &frequency,
            drug.as_deref(),
        ),
        Commands::Vitals {
            start,
            end,
            export,
            show_records,
        } => cmd_vitals(start, end, export, show_records),
        Commands::Staff {
            name,
            department,
            specialty,
            intro,
            polish,
        } => {
            let profile = StaffProfile {
                name,
                department,
                specialty,
                introduction: intro,
            };
            cmd_staff(&config, profile, polish)
        }
        Commands::Guidance {
            name,
            age,
            diagnosis,
            symptoms,
            treatment,
        } => {
            let case = PatientCase {
                name,
                age,
                diagnosis,
                symptoms,
                treatment_plan: treatment,
            };
            cmd_guidance(&config, case)
        }
        Commands::Session { action } => cmd_session(&session_path, action),
    }
}

fn cmd_bmi(session_path: &Path, height: f64, weight: f64) -> Result<()> {
    let input = AnthropometricInput::new(height, weight);
    input.validate_range()?;

    let result = input.classify()?;

    display_bmi(&result);
    display_bmi_reference();

    retain(session_path, |session| session.set(BMI_KEY, &result));
    Ok(())
}

fn cmd_dose(
    session_path: &Path,
    config: &Config,
    weight: f64,
    dose_per_kg: f64,
    frequency: &str,
    drug: Option<&str>,
) -> Result<()> {
    check_range("patient weight (kg)", weight, WEIGHT_RANGE_DOSE_KG)?;
    check_range("dose (mg/kg)", dose_per_kg, DOSE_PER_KG_RANGE_MG)?;

    let per_day = config.dosage.frequency(frequency)?;
    let result = config.dosage.compute(weight, dose_per_kg, per_day)?;

    display_dose(&result);

    println!();
    println!("  Prescription summary");
    println!("  - Drug: {}", drug.unwrap_or("(not specified)"));
    println!("  - Single dose: {:.1} mg", result.single_dose_mg);
    println!("  - Frequency: {}", frequency.trim());
    println!("  - Daily total: {:.1} mg", result.daily_dose_mg);
    println!();
    println!(
        "  {}",
        "This calculator is an educational demo. Always check the drug guidelines in clinical practice."
            .yellow()
    );

    retain(session_path, |session| session.set(DOSE_KEY, &result));
    Ok(())
}

/// Keep a result in the session; a failure here never hides the result
fn retain<F>(session_path: &Path, f: F)
where
    F: FnOnce(&mut SessionState) -> Result<()>,
{
    if let Err(e) = SessionState::update(session_path, f) {
        tracing::warn!("Failed to save session {:?}: {}", session_path, e);
        eprintln!("Note: result not retained in this session: {}", e);
    }
}

fn cmd_vitals(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    export: Option<PathBuf>,
    show_records: bool,
) -> Result<()> {
    let (first, last) = vitals::dataset_range();
    let start = start.unwrap_or(first);
    let end = end.unwrap_or(last);

    let records = vitals::filter_range(vitals::patient_vitals(), start, end)?;

    println!("\n  Patient vitals {} → {}", start, end);
    println!();

    match vitals::summarize(&records) {
        Some(summary) => {
            println!("  Days:                {}", summary.count);
            println!("  Mean systolic BP:    {:.0} mmHg", summary.mean_systolic_mmhg);
            println!("  Mean diastolic BP:   {:.0} mmHg", summary.mean_diastolic_mmhg);
            println!("  Mean glucose:        {:.0} mg/dL", summary.mean_glucose_mg_dl);
            println!("  Mean temperature:    {:.1}°C", summary.mean_temperature_c);
        }
        None => {
            println!("  No records in the selected range.");
        }
    }

    if show_records && !records.is_empty() {
        println!();
        println!("  date        sys  dia  glu  temp");
        for r in &records {
            println!(
                "  {}  {:>3}  {:>3}  {:>3}  {:.1}",
                r.date, r.systolic_mmhg, r.diastolic_mmhg, r.glucose_mg_dl, r.temperature_c
            );
        }
    }

    if let Some(target) = export {
        let path = if target.is_dir() {
            target.join(vitals::default_export_name(start, end))
        } else {
            target
        };
        let count = vitals::export_csv_to_path(&records, &path)?;
        println!();
        println!("✓ Exported {} records", count);
        println!("  CSV: {}", path.display());
    }

    println!();
    Ok(())
}

fn cmd_staff(config: &Config, profile: StaffProfile, polish: bool) -> Result<()> {
    let fields = PromptFields::StaffIntroduction(profile.clone());
    fields.validate()?;

    println!("\n✓ Staff member registered");
    println!("  - Name: {}", profile.name);
    println!("  - Department: {}", profile.department);
    println!("  - Specialty: {}", profile.specialty);
    println!();

    if polish {
        let polished = build_generator(config).and_then(|g| g.generate(&fields));
        match polished {
            Ok(text) => {
                println!("  Original introduction");
                println!("  {}", profile.introduction);
                println!();
                println!("  Improved introduction");
                println!("  {}", text);
                println!();
                println!("  {}", "Generated automatically from the details above.".dimmed());
                return Ok(());
            }
            Err(e) => {
                tracing::debug!("Introduction polishing failed: {:?}", e);
                eprintln!("Could not generate an improved introduction: {}", e);
            }
        }
    }

    println!("  Introduction");
    println!("  {}", profile.introduction);
    Ok(())
}

fn cmd_guidance(config: &Config, case: PatientCase) -> Result<()> {
    let fields = PromptFields::PatientGuidance(case.clone());
    fields.validate()?;

    println!("\n  Patient summary");
    println!("  - Name: {}", case.name);
    println!("  - Age: {}", case.age);
    println!("  - Diagnosis: {}", case.diagnosis);
    println!("  - Symptoms: {}", case.symptoms);
    println!("  - Treatment plan: {}", case.treatment_plan);
    println!();

    let message = build_generator(config)
        .and_then(|g| g.generate(&fields))
        .map_err(|e| {
            eprintln!("Guidance message generation failed: {}", e);
            Error::Generation(e)
        })?;

    println!("  Guidance message");
    println!();
    for line in message.lines() {
        println!("  {}", line);
    }
    println!();
    println!("  {}", "Generated automatically from the patient details above.".dimmed());
    Ok(())
}

fn cmd_session(session_path: &Path, action: SessionAction) -> Result<()> {
    match action {
        SessionAction::Show => {
            let session = SessionState::load(session_path)?;
            let bmi = session.get::<BmiResult>(BMI_KEY);
            let dose = session.get::<DoseResult>(DOSE_KEY);

            if bmi.is_none() && dose.is_none() {
                println!("No results retained in this session.");
                return Ok(());
            }

            println!(
                "Session {} (started {})",
                session.id,
                session.started_at.format("%Y-%m-%d %H:%M")
            );
            if let Some(result) = bmi {
                display_bmi(&result);
            }
            if let Some(result) = dose {
                display_dose(&result);
            }
        }
        SessionAction::Clear => {
            SessionState::update(session_path, |session| {
                session.clear();
                Ok(())
            })?;
            println!("✓ Session cleared");
        }
    }
    Ok(())
}

fn build_generator(config: &Config) -> std::result::Result<Box<dyn TextGenerator>, ServiceError> {
    let generator = HttpTextGenerator::from_config(&config.generation)?;
    Ok(Box::new(generator))
}

fn paint_category(category: BmiCategory) -> ColoredString {
    let label = category.label();
    let painted = match category.color() {
        "blue" => label.blue(),
        "green" => label.green(),
        "orange" => label.truecolor(255, 165, 0),
        "red" => label.red(),
        _ => label.normal(),
    };
    painted.bold()
}

fn display_bmi(result: &BmiResult) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BMI RESULT");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  BMI: {:.1}", result.bmi);
    println!("  Category: {}", paint_category(result.category));
    println!();
    println!(
        "  Target weight (BMI {}): {:.1} kg",
        medcalc_core::bmi::TARGET_BMI,
        result.target_weight_kg
    );
    match result.goal() {
        WeightGoal::Lose(kg) => println!("  Weight to lose: {:.1} kg", kg),
        WeightGoal::Gain(kg) => println!("  Weight to gain: {:.1} kg", kg),
        WeightGoal::AtTarget => println!("  Currently at target weight!"),
    }
    println!();
}

fn display_bmi_reference() {
    println!("  BMI reference (WHO Asia-Pacific)");
    for category in BmiCategory::ALL {
        println!("    {:<18} {}", category.label(), category.range_text());
    }
    println!();
}

fn display_dose(result: &DoseResult) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DOSE CALCULATION");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Single dose: {:.1} mg", result.single_dose_mg);
    println!("  Daily total: {:.1} mg", result.daily_dose_mg);
    println!();

    if result.over_threshold {
        println!(
            "  {}",
            format!("⚠ WARNING: daily total exceeds {} mg!", result.threshold_mg)
                .red()
                .bold()
        );
        println!("  Calculated daily total: {:.1} mg", result.daily_dose_mg);
        println!("  Check the drug guidelines before prescribing.");
    } else {
        println!("  {}", "✓ Daily total is within the safe range.".green());
    }
}
