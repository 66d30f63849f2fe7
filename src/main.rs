// Evaluación de movimientos con sensores del teléfono - Rust
//
// 1. Entrenar con las grabaciones de datos/<Movimiento>/*.csv:
//      movimetro train --data datos
// 2. Calificar una grabación contra el movimiento pedido:
//      movimetro score temp_data/sensor_data_x.csv --movement Curl
// 3. Evaluar con test/<Movimiento>/ y test/mixed/:
//      movimetro evaluate --test test
//
// Nivel de log con RUST_LOG (por defecto info).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use movimetro::csv_loader::load_table_from_csv;
use movimetro::evaluation::EvaluationSystem;
use movimetro::feature_extractor::FeatureExtractor;
use movimetro::model_store::{load_system, save_system};
use movimetro::rating::{PracticeSession, RatingTier};
use movimetro::{EvaluationConfig, ScoreOutcome, SimilarityMethod, TelemetryTable};

#[derive(Parser)]
#[command(name = "movimetro")]
#[command(about = "Califica movimientos comparándolos con centroides de referencia")]
struct Cli {
    /// Modelo exportado por `train`
    #[arg(long, global = true, default_value = "movement_system.json")]
    model: PathBuf,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Train(TrainArgs),
    Score(ScoreArgs),
    Classify(ClassifyArgs),
    Evaluate(EvaluateArgs),
    Practice(PracticeArgs),
    Features(FeaturesArgs),
}

#[derive(clap::Args)]
#[command(about = "Entrena centroides y clasificador y exporta el modelo")]
struct TrainArgs {
    #[arg(long, default_value = "datos")]
    data: PathBuf,
    /// Configuración TOML (movimientos, sensores, método, bosque)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
#[command(about = "Califica una grabación contra un movimiento")]
struct ScoreArgs {
    csv: PathBuf,
    #[arg(long, short)]
    movement: String,
    /// inverse_distance | exp (por defecto, el del modelo)
    #[arg(long)]
    method: Option<String>,
}

#[derive(clap::Args)]
#[command(about = "Identifica el movimiento de una grabación")]
struct ClassifyArgs {
    csv: PathBuf,
}

#[derive(clap::Args)]
#[command(about = "Evalúa las carpetas de prueba individuales y mixtas")]
struct EvaluateArgs {
    #[arg(long, default_value = "test")]
    test: PathBuf,
}

#[derive(clap::Args)]
#[command(about = "Reproduce grabaciones como intentos sucesivos de la partida")]
struct PracticeArgs {
    /// Un CSV por intento; los movimientos se piden en el orden del registro
    #[arg(required = true)]
    attempts: Vec<PathBuf>,
}

#[derive(clap::Args)]
#[command(about = "Muestra el vector de características de una grabación")]
struct FeaturesArgs {
    csv: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<EvaluationConfig> {
    match path {
        Some(path) => {
            EvaluationConfig::load(path).with_context(|| format!("No se pudo leer {:?}", path))
        }
        None => Ok(EvaluationConfig::default()),
    }
}

fn load_model(cli: &Cli) -> Result<EvaluationSystem> {
    load_system(&cli.model).with_context(|| format!("No se pudo cargar el modelo {:?}", cli.model))
}

fn load_csv(path: &Path) -> Result<TelemetryTable> {
    load_table_from_csv(path).with_context(|| format!("CSV inválido {:?}", path))
}

fn describe(outcome: &ScoreOutcome) -> String {
    let tier = RatingTier::from_outcome(outcome);
    match outcome {
        ScoreOutcome::Scored(v) => format!("{} {:.4}", tier, v),
        ScoreOutcome::NoReference => format!("{} (sin datos de referencia)", tier),
    }
}

fn train(cli: &Cli, args: &TrainArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let mut system = EvaluationSystem::new(config)?;
    let report = system.train(&args.data)?;

    for (movement, count) in &report.recordings {
        println!("  {:<15} {} grabación(es)", movement, count);
    }
    if !report.classifier_trained {
        println!("⚠️  No se entrenó el clasificador");
    }

    save_system(&system, &cli.model)?;
    println!("✅ Sistema exportado en {:?}", cli.model);
    Ok(())
}

fn score(cli: &Cli, args: &ScoreArgs) -> Result<()> {
    let mut system = load_model(cli)?;
    if let Some(method) = &args.method {
        system.set_similarity(SimilarityMethod::from_name(method));
    }
    let table = load_csv(&args.csv)?;
    let outcome = system.score(&table, &args.movement)?;
    println!("🎯 {}: {}", args.movement, describe(&outcome));
    Ok(())
}

fn classify(cli: &Cli, args: &ClassifyArgs) -> Result<()> {
    let system = load_model(cli)?;
    let table = load_csv(&args.csv)?;
    let (movement, confidence) = system.classify(&table)?;
    println!("🥇 Movimiento predicho: {} ({:.1}%)", movement, confidence * 100.0);
    Ok(())
}

fn evaluate(cli: &Cli, args: &EvaluateArgs) -> Result<()> {
    let system = load_model(cli)?;

    println!("Evaluando movimientos individuales...");
    for result in system.evaluate_individual(&args.test)? {
        let name = result.file.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        println!("  Calificación para {} en {}: {}", name, result.movement, result.outcome);
    }

    if system.classifier().is_none() {
        println!("⚠️  El modelo no tiene clasificador, se omite la evaluación mixta");
        return Ok(());
    }

    println!("\nEvaluando clasificación de movimientos mixtos...");
    match system.evaluate_mixed(&args.test)? {
        Some(report) => {
            println!(
                "Precisión del modelo de clasificación en datos mixtos: {:.4}",
                report.accuracy
            );
            println!("Reporte de clasificación:\n{}", report);
        }
        None => println!("No hay datos de prueba mixtos."),
    }
    Ok(())
}

fn practice(cli: &Cli, args: &PracticeArgs) -> Result<()> {
    let system = load_model(cli)?;
    let mut session = PracticeSession::new(system.movements().to_vec());

    for csv in &args.attempts {
        let Some(movement) = session.current_movement().map(str::to_string) else {
            bail!("El modelo no tiene movimientos registrados");
        };

        let outcome = match load_table_from_csv(csv) {
            Ok(table) => system.score(&table, &movement)?,
            Err(e) => {
                eprintln!("❌ No se pudieron obtener datos de {:?}: {}", csv, e);
                ScoreOutcome::NoReference
            }
        };
        let tier = session.record(outcome);
        println!("🎬 {} ← {:?}: {} {:.4}", movement, csv, tier, outcome.value());

        if session.advance() {
            println!("\n{}\n", session.summary());
        }
    }

    println!("\n{}", session.summary());
    Ok(())
}

fn features(args: &FeaturesArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let table = load_csv(&args.csv)?;
    let extractor = FeatureExtractor::new(config.sensors.clone());
    let features = movimetro::sanitizer::clean(&extractor.extract(&table));

    println!("📊 {} features ({} filas):", features.len(), table.len());
    for (idx, value) in features.iter().enumerate() {
        let sensor = &config.sensors[idx / movimetro::types::FEATURES_PER_SENSOR];
        println!("  {:03} {:<8} {:>14.6}", idx, sensor, value);
    }
    Ok(())
}

fn main() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Train(args) => train(&cli, args),
        Commands::Score(args) => score(&cli, args),
        Commands::Classify(args) => classify(&cli, args),
        Commands::Evaluate(args) => evaluate(&cli, args),
        Commands::Practice(args) => practice(&cli, args),
        Commands::Features(args) => features(args),
    }
}
