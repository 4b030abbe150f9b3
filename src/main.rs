use allotment_analyzer::analyzer::{AnalysisContext, Cumulation, Denominator, FillOptions, Granularity};
use allotment_analyzer::diff::{compare_matrices, Change, TotalsLevel, YearLabels};
use allotment_analyzer::models::{CompareConfig, Config};
use allotment_analyzer::round::RecordSet;
use allotment_analyzer::scraper::TableLoader;
use allotment_analyzer::seat_matrix::{SeatMatrix, BEFORE_ROUNDS};
use allotment_analyzer::table::Table;
use anyhow::{Context, Result};
use clap::{Arg, Command};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const ANALYSIS_ITEMS: [&str; 5] = [
    "SeatMatrix",
    "College-wise",
    "College-wise Branch-wise",
    "College-wise Branch-wise Community-wise",
    "Community-wise Analysis",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Analyze,
    Forms,
    Compare,
    All,
}

impl Task {
    fn from_name(name: &str) -> Self {
        match name {
            "analyze" => Task::Analyze,
            "forms" => Task::Forms,
            "compare" => Task::Compare,
            _ => Task::All,
        }
    }

    fn needs_rounds(self) -> bool {
        self != Task::Compare
    }

    fn includes(self, other: Task) -> bool {
        self == Task::All || self == other
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let matches = Command::new("allotment-analyzer")
        .version("1.0")
        .about("Analyzes counselling seat allotment rounds")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("task")
                .value_name("TASK")
                .help("What to produce")
                .value_parser(["analyze", "forms", "compare", "all"])
                .default_value("all"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");
    let task = Task::from_name(matches.get_one::<String>("task").map(String::as_str).unwrap_or("all"));

    // Load or create configuration
    let config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please edit {} and point it at your seat matrix and round lists, then run the program again.", config_file);
        return Ok(());
    };

    let output_dir = Path::new(config.output_directory.as_deref().unwrap_or("output")).join(&config.year);
    fs::create_dir_all(&output_dir)?;
    clean_output_directory(&output_dir, task)?;

    println!("🔍 Analyzing allotments for year: {}", config.year);
    println!("📄 Output directory: {} (cleaned)", output_dir.display());

    let loader = TableLoader::new();

    if task.needs_rounds() {
        let context = load_context(&loader, &config).await?;

        if task.includes(Task::Analyze) {
            generate_seat_progression(&context, &output_dir)?;
            generate_fill_reports(&context, &config, &output_dir)?;
            write_table(
                &context.community_distribution().to_table(),
                &output_dir.join("Community-wise Analysis").join("College-wise Community Distribution.csv"),
            )?;
        }

        if task.includes(Task::Forms) {
            let forms_dir = output_dir.join("Forms");
            write_table(&context.form1(), &forms_dir.join("Form 1.csv"))?;
            write_table(&context.form2(), &forms_dir.join("Form 2.csv"))?;
            write_table(&context.form3(), &forms_dir.join("Form 3.csv"))?;
            println!("📝 Forms 1-3 written");
        }
    }

    if task.includes(Task::Compare) {
        match &config.compare {
            Some(compare) => generate_comparison(&loader, &config, compare, &output_dir).await?,
            None => println!("⏭️  No [compare] section in configuration, skipping comparison"),
        }
    }

    println!("\n✅ Analysis complete! Results saved to: {}", output_dir.display());
    Ok(())
}

async fn load_context(loader: &TableLoader, config: &Config) -> Result<AnalysisContext> {
    println!("📂 Loading seat matrix from: {}", config.seat_matrix);
    let seat_matrix = loader.load(&config.seat_matrix).await?;

    let mut rounds = Vec::with_capacity(config.rounds.len());
    for source in &config.rounds {
        println!("📄 Processing: {} ({})", source.name, source.source);
        let raw = loader.load(&source.source).await?;
        println!("   ✅ Found {} rows", raw.len());
        rounds.push((source.name.clone(), raw));
    }

    let context = AnalysisContext::from_tables(rounds, seat_matrix, &config.round_columns, &config.seat_matrix_columns)
        .context("Input tables do not match the configured columns")?;
    println!(
        "💺 {} seat rows, {} seats",
        context.seat_matrix().len(),
        context.seat_matrix().total()
    );
    println!("👥 {} candidates hold seats after the last round", context.rank_list().len());
    Ok(context)
}

fn generate_seat_progression(context: &AnalysisContext, output_dir: &Path) -> Result<()> {
    let steps = context
        .seat_progression()
        .context("Filled seat counts overflowed")?;

    let base = output_dir.join("SeatMatrix");
    for step in &steps {
        let (remaining, filled) = if step.label == BEFORE_ROUNDS {
            (step.label.clone(), step.label.clone())
        } else {
            (format!("Remaining {}", step.label), format!("Filled {}", step.label))
        };
        write_table(&step.remaining.to_table(), &base.join("Remaining").join(format!("{}.csv", remaining)))?;
        write_table(&step.filled.to_table(), &base.join("Filled").join(format!("{}.csv", filled)))?;
    }

    println!("💺 Seat matrix progression: {} snapshots", steps.len());
    Ok(())
}

fn generate_fill_reports(context: &AnalysisContext, config: &Config, output_dir: &Path) -> Result<()> {
    let mut targets = vec![
        (Granularity::College, output_dir.join("College-wise"), "College-wise"),
        (
            Granularity::CollegeBranch,
            output_dir.join("College-wise Branch-wise"),
            "College-wise Branch-wise",
        ),
    ];
    for community in config.communities() {
        targets.push((
            Granularity::CollegeBranchCommunity(community),
            output_dir
                .join("College-wise Branch-wise Community-wise")
                .join(community.as_str()),
            "College-wise Branch-wise Community-wise",
        ));
    }

    let mut skipped = false;
    for (granularity, dir, prefix) in &targets {
        for denominator in [Denominator::Filled, Denominator::Total] {
            for cumulative in [true, false] {
                let options = FillOptions::new(*granularity)
                    .denominator(denominator)
                    .cumulative(cumulative)
                    .with_cutoffs();
                let report = context.fill_report(&options);
                skipped |= report.cumulation == Cumulation::SkippedSingleRound;

                let name = format!(
                    "{} Round-wise Filling - By {} - {}.csv",
                    prefix,
                    match denominator {
                        Denominator::Filled => "Filled",
                        Denominator::Total => "Total",
                    },
                    if cumulative { "Cumulative" } else { "Non-Cumulative" },
                );
                write_table(&report.to_table(), &dir.join(name))?;
            }
        }
    }

    if skipped {
        println!("   ⚠️  Cannot cumulate over a single round, cumulative reports hold per-round values");
    }
    println!("📊 Fill reports written for {} groupings", targets.len());
    Ok(())
}

async fn generate_comparison(
    loader: &TableLoader,
    config: &Config,
    compare: &CompareConfig,
    output_dir: &Path,
) -> Result<()> {
    let columns = if compare.columns.is_empty() {
        &config.seat_matrix_columns
    } else {
        &compare.columns
    };

    println!("📂 Comparing seat matrices: {} -> {}", compare.previous, compare.current);
    let previous = SeatMatrix::from_table(loader.load(&compare.previous).await?, columns)
        .with_context(|| format!("Invalid seat matrix: {}", compare.previous))?;
    let current = SeatMatrix::from_table(loader.load(&compare.current).await?, columns)
        .with_context(|| format!("Invalid seat matrix: {}", compare.current))?;

    let labels = match (&compare.previous_label, &compare.current_label) {
        (Some(previous), Some(current)) => Some(YearLabels {
            previous: previous.clone(),
            current: current.clone(),
        }),
        _ => None,
    };

    let comparison_dir = output_dir.join("Comparison");
    for (level, file) in [(TotalsLevel::College, "Form 4.csv"), (TotalsLevel::CollegeBranch, "Form 5.csv")] {
        let diff = compare_matrices(level, &previous, &current);
        println!(
            "   📈 {}: {} new, {} removed, {} common",
            file,
            diff.count(Change::New),
            diff.count(Change::Removed),
            diff.count(Change::Common)
        );
        write_table(&diff.to_table(labels.as_ref()), &comparison_dir.join(file))?;
    }
    Ok(())
}

fn write_table(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    table
        .write_csv(file)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// Clean up previous results of the selected task
fn clean_output_directory(output_dir: &Path, task: Task) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    println!("🧹 Cleaning previous results...");

    let mut items_to_clean: Vec<&str> = Vec::new();
    if task.includes(Task::Analyze) {
        items_to_clean.extend(ANALYSIS_ITEMS);
    }
    if task.includes(Task::Forms) {
        items_to_clean.push("Forms");
    }
    if task.includes(Task::Compare) {
        items_to_clean.push("Comparison");
    }

    for item in &items_to_clean {
        let item_path = output_dir.join(item);

        if item_path.is_file() {
            fs::remove_file(&item_path)?;
            println!("   🗑️  Removed file: {}", item);
        } else if item_path.is_dir() {
            fs::remove_dir_all(&item_path)?;
            println!("   🗑️  Removed directory: {}", item);
        }
    }

    println!("   ✅ Output directory cleaned");
    Ok(())
}
