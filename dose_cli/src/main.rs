use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dose_core::numeric::{format_dose, parse_number};
use dose_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dosekit")]
#[command(about = "Tablet dose decomposition and dispensing planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print the result model as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Write the schedule to a CSV file
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct StrengthArgs {
    /// Available strengths, e.g. "5,10,20"
    #[arg(long, conflicts_with = "product")]
    strengths: Option<String>,

    /// Use the strengths of a preset product (see `presets`)
    #[arg(long)]
    product: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Allow tablets to be split in half
    #[arg(long, conflicts_with = "no_halves")]
    halves: bool,

    /// Never split tablets
    #[arg(long)]
    no_halves: bool,

    /// Most pieces per dose
    #[arg(long)]
    max_pieces: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the best exact combination for one dose
    Combo {
        /// Target dose
        #[arg(long)]
        target: String,

        #[command(flatten)]
        strengths: StrengthArgs,

        #[command(flatten)]
        search: SearchArgs,

        /// Tie-break preference (simple, fewTabs)
        #[arg(long)]
        preference: Option<String>,
    },

    /// One whole tablet a day, strength chosen per weekday
    Pattern {
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        weeks: u32,

        #[command(flatten)]
        strengths: StrengthArgs,

        /// Strength index for Mon..Sun, "-" for none, e.g. "1,0,1,0,1,0,-"
        #[arg(long)]
        pattern: String,

        /// Box size per strength, e.g. "28,28"; defaults to one size for all
        #[arg(long)]
        box_sizes: Option<String>,
    },

    /// Sequential dose steps, each held for a number of days
    Taper {
        #[arg(long)]
        start: Option<NaiveDate>,

        /// A step as DOSExDAYS, e.g. "30x5"; repeat for each step
        #[arg(long = "step", required = true)]
        steps: Vec<String>,

        #[command(flatten)]
        strengths: StrengthArgs,

        #[command(flatten)]
        search: SearchArgs,

        /// Round each strength up to whole boxes
        #[arg(long)]
        box_size: Option<u32>,
    },

    /// Dose varying by weekday or by a repeating cycle
    Variable {
        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        days: u32,

        /// Doses for Mon..Sun, e.g. "5,5,2.5,5,5,2.5,0"
        #[arg(long, conflicts_with = "cycle", required_unless_present = "cycle")]
        weekly: Option<String>,

        /// Repeating doses anchored at the start date, e.g. "5,2.5"
        #[arg(long)]
        cycle: Option<String>,

        #[command(flatten)]
        strengths: StrengthArgs,

        #[command(flatten)]
        search: SearchArgs,

        #[arg(long)]
        preference: Option<String>,

        #[arg(long)]
        tablets_per_sheet: Option<u32>,

        #[arg(long)]
        sheets_per_box: Option<u32>,
    },

    /// One identical dose each week from a single strength
    Weekly {
        /// Weekly dose
        #[arg(long)]
        dose: String,

        /// Tablet strength
        #[arg(long)]
        strength: String,

        #[arg(long)]
        halves: bool,

        /// Dosing weekday, e.g. "fri"
        #[arg(long)]
        anchor: String,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        weeks: u32,

        #[arg(long)]
        box_size: Option<u32>,
    },

    /// Injectable supply with priming and discard wastage
    Supply {
        /// A daily injection as LABEL=UNITS; repeat up to four times
        #[arg(long = "dose", required = true)]
        doses: Vec<String>,

        #[arg(long)]
        days: u32,

        /// Injectable preset (see `presets`)
        #[arg(long)]
        product: Option<String>,

        /// pen, cartridge or vial
        #[arg(long)]
        container: Option<String>,

        /// Units per container
        #[arg(long)]
        capacity: Option<f64>,

        #[arg(long)]
        per_box: Option<u32>,

        /// Priming units per injection (pens and cartridges)
        #[arg(long)]
        priming: Option<f64>,

        /// Discard containers after this many days open
        #[arg(long, conflicts_with = "no_discard")]
        discard_after: Option<u32>,

        /// Never discard containers by age
        #[arg(long)]
        no_discard: bool,

        /// Never draw one injection from two containers
        #[arg(long)]
        no_split: bool,
    },

    /// List built-in product presets
    Presets,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        dose_core::logging::init_with_level("debug");
    } else {
        dose_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let output = Output {
        json: cli.json,
        csv: cli.csv,
    };

    match cli.command {
        Commands::Combo {
            target,
            strengths,
            search,
            preference,
        } => cmd_combo(&output, &config, &target, &strengths, &search, preference),
        Commands::Pattern {
            start,
            weeks,
            strengths,
            pattern,
            box_sizes,
        } => cmd_pattern(
            &output,
            &config,
            start,
            weeks,
            &strengths,
            &pattern,
            box_sizes.as_deref(),
        ),
        Commands::Taper {
            start,
            steps,
            strengths,
            search,
            box_size,
        } => cmd_taper(&output, &config, start, &steps, &strengths, &search, box_size),
        Commands::Variable {
            start,
            days,
            weekly,
            cycle,
            strengths,
            search,
            preference,
            tablets_per_sheet,
            sheets_per_box,
        } => cmd_variable(
            &output,
            &config,
            start,
            days,
            weekly.as_deref(),
            cycle.as_deref(),
            &strengths,
            &search,
            preference,
            (tablets_per_sheet, sheets_per_box),
        ),
        Commands::Weekly {
            dose,
            strength,
            halves,
            anchor,
            start,
            weeks,
            box_size,
        } => cmd_weekly(
            &output,
            &dose,
            &strength,
            halves,
            &anchor,
            start,
            weeks,
            box_size,
        ),
        Commands::Supply {
            doses,
            days,
            product,
            container,
            capacity,
            per_box,
            priming,
            discard_after,
            no_discard,
            no_split,
        } => {
            let request = supply_request(
                &config,
                &doses,
                days,
                product.as_deref(),
                container.as_deref(),
                capacity,
                per_box,
                priming,
                if no_discard {
                    None
                } else {
                    Some(discard_after.unwrap_or(config.supply.discard_after_days))
                },
                !no_split && config.supply.split_injections,
            )?;
            cmd_supply(&output, &request)
        }
        Commands::Presets => cmd_presets(&output),
    }
}

struct Output {
    json: bool,
    csv: Option<PathBuf>,
}

impl Output {
    fn write_csv(&self, entries: &[ScheduleEntry]) -> Result<()> {
        if let Some(path) = &self.csv {
            write_schedule_csv(path, entries)?;
        }
        Ok(())
    }

    fn warn_no_schedule(&self) {
        if self.csv.is_some() {
            tracing::warn!("--csv ignored: this command produces no schedule");
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn parse_single(field: &str, text: &str) -> Result<f64> {
    parse_number(text)
        .ok_or_else(|| Error::invalid(field, format!("'{}' is not a number", text)))
}

/// Split on commas, semicolons or whitespace; every token must be a number
fn parse_list(field: &str, text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| parse_single(field, t))
        .collect()
}

fn find_product(id: &str) -> Result<&'static Product> {
    get_default_catalog()
        .get(id)
        .ok_or_else(|| Error::invalid("product", format!("unknown product '{}'", id)))
}

fn resolve_strengths(args: &StrengthArgs) -> Result<StrengthSet> {
    match (&args.strengths, &args.product) {
        (Some(text), _) => StrengthSet::parse(text),
        (None, Some(id)) => find_product(id)?.strength_set().ok_or_else(|| {
            Error::invalid("product", format!("'{}' is not a tablet product", id))
        })?,
        (None, None) => Err(Error::invalid("strengths", "give --strengths or --product")),
    }
}

fn allow_halves(search: &SearchArgs, strengths: &StrengthArgs, config: &Config) -> bool {
    if search.halves {
        return true;
    }
    if search.no_halves {
        return false;
    }
    let product_halvable = strengths
        .product
        .as_deref()
        .and_then(|id| get_default_catalog().get(id))
        .and_then(|p| match p.form {
            ProductForm::Tablet { halvable, .. } => Some(halvable),
            ProductForm::Injectable { .. } => None,
        });
    product_halvable.unwrap_or(config.search.allow_halves)
}

fn max_pieces(search: &SearchArgs, config: &Config) -> usize {
    search.max_pieces.unwrap_or_else(|| config.search_max_pieces())
}

fn resolve_preference(text: Option<String>, config: &Config) -> Result<Preference> {
    match text {
        Some(t) => t.parse(),
        None => Ok(config.search.preference),
    }
}

fn cmd_combo(
    output: &Output,
    config: &Config,
    target: &str,
    strengths: &StrengthArgs,
    search: &SearchArgs,
    preference: Option<String>,
) -> Result<()> {
    output.warn_no_schedule();
    let target = parse_single("target", target)?;
    let strength_set = resolve_strengths(strengths)?;
    let preference = resolve_preference(preference, config)?;

    let combination = find_best_combo_exact(
        target,
        &strength_set,
        allow_halves(search, strengths, config),
        max_pieces(search, config),
        preference,
    )?
    .ok_or(Error::UnrepresentableDose { dose: target })?;

    if output.json {
        return print_json(&serde_json::json!({
            "target": target,
            "preference": preference,
            "combination": combination,
            "tablets": combination.physical_tablets(),
        }));
    }

    println!(
        "{} = {} ({} tablets, score {})",
        format_dose(target),
        combination,
        combination.physical_tablets(),
        combination.score
    );
    Ok(())
}

fn cmd_pattern(
    output: &Output,
    config: &Config,
    start: Option<NaiveDate>,
    weeks: u32,
    strengths: &StrengthArgs,
    pattern: &str,
    box_sizes: Option<&str>,
) -> Result<()> {
    let strength_set = resolve_strengths(strengths)?;

    let tokens: Vec<&str> = pattern
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 7 {
        return Err(Error::invalid(
            "pattern",
            format!("expected 7 entries (Mon..Sun), got {}", tokens.len()),
        ));
    }
    let mut choices = [None; 7];
    for (slot, token) in choices.iter_mut().zip(&tokens) {
        *slot = match *token {
            "-" | "x" => None,
            t => Some(t.parse::<usize>().map_err(|_| {
                Error::invalid("pattern", format!("'{}' is not a strength index", t))
            })?),
        };
    }

    let default_box = strengths
        .product
        .as_deref()
        .and_then(|id| get_default_catalog().get(id))
        .and_then(|p| match p.form {
            ProductForm::Tablet { box_size, .. } => Some(box_size),
            ProductForm::Injectable { .. } => None,
        })
        .unwrap_or(config.packaging.box_size);
    let box_sizes = match box_sizes {
        Some(text) => text
            .split(',')
            .map(|t| {
                t.trim().parse::<u32>().map_err(|_| {
                    Error::invalid("box_sizes", format!("'{}' is not a box size", t))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => vec![default_box; strength_set.len()],
    };

    let schedule = generate_day_pattern(&DayPatternRequest {
        start: start.unwrap_or_else(today),
        weeks,
        strengths: strength_set,
        choices,
        box_sizes,
    })?;
    output.write_csv(&schedule.entries)?;

    if output.json {
        return print_json(&schedule);
    }

    println!("Day pattern {} to {}", schedule.start, schedule.end);
    print_entries(&schedule.entries);
    println!();
    println!(
        "  {:>10}  {:>6}  {:>6}  {:>9}  {:>9}",
        "Strength", "Days", "Boxes", "Dispensed", "Remainder"
    );
    for line in &schedule.lines {
        println!(
            "  {:>10}  {:>6}  {:>6}  {:>9}  {:>9}",
            format_dose(line.strength),
            line.days,
            line.boxes,
            line.dispensed,
            line.remainder
        );
    }
    Ok(())
}

fn cmd_taper(
    output: &Output,
    config: &Config,
    start: Option<NaiveDate>,
    steps: &[String],
    strengths: &StrengthArgs,
    search: &SearchArgs,
    box_size: Option<u32>,
) -> Result<()> {
    let steps = steps
        .iter()
        .map(|s| parse_step(s))
        .collect::<Result<Vec<_>>>()?;

    let request = TaperRequest {
        start: start.unwrap_or_else(today),
        steps,
        strengths: resolve_strengths(strengths)?,
        allow_halves: allow_halves(search, strengths, config),
        max_pieces: max_pieces(search, config),
        box_size,
    };
    let schedule = generate_taper(&request)?;
    output.write_csv(&schedule.entries())?;

    if output.json {
        return print_json(&schedule);
    }

    println!("Taper {} to {}", schedule.start, schedule.end);
    for step in &schedule.steps {
        println!(
            "  Step {}: {} to {} ({} days)  {}  ->  {}",
            step.step,
            step.start,
            step.end,
            step.days,
            format_dose(step.dose),
            if step.combination.is_empty() {
                "stop".to_string()
            } else {
                step.combination.to_string()
            }
        );
    }
    print_lines(&schedule.lines);
    Ok(())
}

/// `30x5` -> 30 for 5 days
fn parse_step(text: &str) -> Result<TaperStep> {
    let (dose, days) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::invalid("step", format!("'{}' is not DOSExDAYS", text)))?;
    Ok(TaperStep {
        dose: parse_single("step", dose)?,
        days: days
            .trim()
            .parse()
            .map_err(|_| Error::invalid("step", format!("'{}' has invalid days", text)))?,
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_variable(
    output: &Output,
    config: &Config,
    start: Option<NaiveDate>,
    days: u32,
    weekly: Option<&str>,
    cycle: Option<&str>,
    strengths: &StrengthArgs,
    search: &SearchArgs,
    preference: Option<String>,
    (tablets_per_sheet, sheets_per_box): (Option<u32>, Option<u32>),
) -> Result<()> {
    let source = match (weekly, cycle) {
        (Some(weekly), _) => {
            let doses = parse_list("weekly", weekly)?;
            let doses: [f64; 7] = doses.try_into().map_err(|d: Vec<f64>| {
                Error::invalid("weekly", format!("expected 7 doses, got {}", d.len()))
            })?;
            DoseSource::Weekly { doses }
        }
        (None, Some(cycle)) => DoseSource::Cyclic {
            cycle: parse_list("cycle", cycle)?,
        },
        (None, None) => return Err(Error::invalid("weekly", "give --weekly or --cycle")),
    };

    let request = VariableRequest {
        start: start.unwrap_or_else(today),
        days,
        source,
        strengths: resolve_strengths(strengths)?,
        allow_halves: allow_halves(search, strengths, config),
        max_pieces: max_pieces(search, config),
        preference: resolve_preference(preference, config)?,
        tablets_per_sheet: tablets_per_sheet.unwrap_or(config.packaging.tablets_per_sheet),
        sheets_per_box: sheets_per_box.unwrap_or(config.packaging.sheets_per_box),
    };
    let schedule = generate_variable(&request)?;
    output.write_csv(&schedule.entries)?;

    if output.json {
        return print_json(&schedule);
    }

    println!(
        "Variable dosing {} to {} ({})",
        schedule.start, schedule.end, schedule.preference
    );
    print_entries(&schedule.entries);
    print_lines(&schedule.lines);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_weekly(
    output: &Output,
    dose: &str,
    strength: &str,
    halves: bool,
    anchor: &str,
    start: Option<NaiveDate>,
    weeks: u32,
    box_size: Option<u32>,
) -> Result<()> {
    let request = OnceWeeklyRequest {
        weekly_dose: parse_single("dose", dose)?,
        strength: parse_single("strength", strength)?,
        allow_halves: halves,
        anchor: parse_weekday(anchor)?,
        start: start.unwrap_or_else(today),
        weeks,
        box_size,
    };
    let schedule = generate_once_weekly(&request)?;
    output.write_csv(&schedule.entries)?;

    if output.json {
        return print_json(&schedule);
    }

    println!(
        "Once weekly from {}: {} each week",
        schedule.anchor_date, schedule.per_week
    );
    print_entries(&schedule.entries);
    print_lines(std::slice::from_ref(&schedule.line));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn supply_request(
    config: &Config,
    doses: &[String],
    days: u32,
    product: Option<&str>,
    container: Option<&str>,
    capacity: Option<f64>,
    per_box: Option<u32>,
    priming: Option<f64>,
    discard_after_days: Option<u32>,
    split_injections: bool,
) -> Result<SupplyRequest> {
    let injections = doses
        .iter()
        .map(|d| {
            let (label, units) = d.split_once('=').unwrap_or(("dose", d.as_str()));
            Ok(Injection {
                label: label.trim().to_string(),
                units: parse_single("dose", units)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let preset = match product {
        Some(id) => match find_product(id)?.form {
            ProductForm::Injectable {
                container,
                capacity,
                containers_per_box,
            } => Some((container, capacity, containers_per_box)),
            ProductForm::Tablet { .. } => {
                return Err(Error::invalid(
                    "product",
                    format!("'{}' is not an injectable product", id),
                ))
            }
        },
        None => None,
    };

    let container = match container {
        Some(text) => text.parse()?,
        None => preset.map_or(ContainerKind::Pen, |p| p.0),
    };

    Ok(SupplyRequest {
        injections,
        container,
        capacity: capacity
            .or(preset.map(|p| p.1))
            .unwrap_or(config.supply.capacity),
        containers_per_box: Some(
            per_box
                .or(preset.map(|p| p.2))
                .unwrap_or(config.supply.containers_per_box),
        ),
        priming_units: priming.unwrap_or(config.supply.priming_units),
        discard_after_days,
        days,
        split_injections,
    })
}

fn cmd_supply(output: &Output, request: &SupplyRequest) -> Result<()> {
    output.warn_no_schedule();
    let estimate = estimate_supply(request)?;

    if output.json {
        return print_json(&estimate);
    }

    println!(
        "Supply for {} days: {} units/day + {} priming ({} of {} units)",
        estimate.days,
        format_dose(estimate.daily_dose),
        format_dose(estimate.daily_priming),
        request.container,
        format_dose(request.capacity)
    );
    println!("  Containers:   {}", estimate.containers);
    if let Some(boxes) = estimate.boxes {
        println!("  Boxes:        {}", boxes);
    }
    println!("  Consumed:     {}", format_dose(estimate.units_consumed()));
    println!(
        "  Wasted:       {} ({} discards)",
        format_dose(estimate.units_wasted()),
        estimate.discard_events
    );
    println!("  Leftover:     {}", format_dose(estimate.leftover));
    Ok(())
}

fn cmd_presets(output: &Output) -> Result<()> {
    output.warn_no_schedule();
    let catalog = get_default_catalog();
    let products = catalog.sorted();

    if output.json {
        return print_json(&products);
    }

    for product in products {
        let detail = match &product.form {
            ProductForm::Tablet {
                strengths,
                halvable,
                box_size,
            } => format!(
                "{} {}{}, box of {}",
                strengths
                    .iter()
                    .map(|s| format_dose(*s))
                    .collect::<Vec<_>>()
                    .join("/"),
                product.unit,
                if *halvable { ", halvable" } else { "" },
                box_size
            ),
            ProductForm::Injectable {
                container,
                capacity,
                containers_per_box,
            } => format!(
                "{} of {} {}, {} per box",
                container,
                format_dose(*capacity),
                product.unit,
                containers_per_box
            ),
        };
        println!("  {:<18} {:<45} {}", product.id, product.name, detail);
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entries(entries: &[ScheduleEntry]) {
    for entry in entries {
        println!(
            "  {} {}  {:>6}  {}",
            entry.date,
            entry.weekday,
            format_dose(entry.dose),
            entry.combination
        );
    }
}

fn print_lines(lines: &[DispenseLine]) {
    println!();
    println!(
        "  {:>10}  {:>6}  {:>6}  {:>7}  Packs",
        "Strength", "Whole", "Halves", "Tablets"
    );
    for line in lines {
        println!(
            "  {:>10}  {:>6}  {:>6}  {:>7}  {}",
            format_dose(line.strength),
            line.whole_pieces,
            line.half_pieces,
            line.tablets,
            line.packs.as_ref().map(describe_packs).unwrap_or_default()
        );
    }
}

fn describe_packs(packs: &PackCount) -> String {
    match packs {
        PackCount::Boxes {
            box_size,
            boxes,
            dispensed,
            remainder,
        } => format!(
            "{} x box of {} ({} dispensed, {} spare)",
            boxes, box_size, dispensed, remainder
        ),
        PackCount::Sheets {
            tablets_per_sheet,
            sheets_per_box,
            sheets,
            boxes,
        } => format!(
            "{} sheets of {}, {} x box of {} sheets",
            sheets, tablets_per_sheet, boxes, sheets_per_box
        ),
    }
}
