use std::collections::BTreeMap;
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use log::{debug, error, info};
use serde::Serialize;
use serde_json::json;

extern crate hexfire;

use hexfire::catalog::{load_and_install, DEFAULT_CATALOG_FILE};
use hexfire::combat::{compute_to_hit, resolve_attack, AttackContext, TargetRef};
use hexfire::damage::{expected_damage, select_ammo};
use hexfire::dice::{Dice, RandomSource};
use hexfire::error::RulesError;
use hexfire::game::GameState;
use hexfire::hex::Coords;
use hexfire::options::GameOptions;
use hexfire::spotting::best_spotter;
use hexfire::stacking::{preferred_displacement, stacking_violation};
use hexfire::unit::UnitId;
use hexfire::visibility::update_sensor_contacts;

/// Answer tactical combat rules queries against a battlefield snapshot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file with the weapon catalog
    #[arg(short, long, default_value = DEFAULT_CATALOG_FILE)]
    catalog: String,

    /// JSON file with the battlefield snapshot
    #[arg(short, long)]
    scenario: String,

    /// JSON file with game options, replacing those in the scenario
    #[arg(short, long)]
    options: Option<String>,

    /// Seed the dice so rolls can be replayed.  Without a seed the dice are seeded from the system.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work out the number needed to hit with one weapon
    ToHit(AttackArgs),
    /// Roll one weapon attack
    Fire(AttackArgs),
    /// Pick the ammunition bin a weapon should load against a target
    SelectAmmo(AttackArgs),
    /// Refresh every unit's sensor contacts and firing solutions
    Sensors,
    /// Find where a unit would be pushed out of its hex
    Displace {
        #[arg(short, long)]
        unit: UnitId,
        /// Direction of the push, 0 (north) to 5 clockwise
        #[arg(short, long)]
        direction: u8,
    },
    /// Check whether a unit may enter a hex
    Stacking {
        #[arg(short, long)]
        unit: UnitId,
        /// Destination hex as x,y
        #[arg(long, value_parser = parse_coords)]
        to: Coords,
    },
    /// Find the best spotter for an indirect attack
    Spotter {
        #[arg(short, long)]
        attacker: UnitId,
        #[arg(short, long)]
        target: UnitId,
    },
}

#[derive(clap::Args, Debug)]
struct AttackArgs {
    #[arg(short, long)]
    attacker: UnitId,

    /// Index of the weapon on the attacker
    #[arg(short, long, default_value_t = 0)]
    weapon: usize,

    /// Target unit
    #[arg(short, long, conflicts_with = "hex")]
    target: Option<UnitId>,

    /// Target hex as x,y
    #[arg(long, value_parser = parse_coords)]
    hex: Option<Coords>,

    /// Fire indirectly
    #[arg(short, long)]
    indirect: bool,
}

impl AttackArgs {
    fn target_ref(&self) -> TargetRef {
        match (self.target, self.hex) {
            (Some(id), _) => TargetRef::Unit(id),
            (None, Some(coords)) => TargetRef::Hex(coords),
            (None, None) => Args::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "an attack needs either --target or --hex",
                )
                .exit(),
        }
    }

    fn context<'a>(&self, game: &'a GameState) -> Result<AttackContext<'a>, RulesError> {
        AttackContext::new(
            game,
            self.attacker,
            self.weapon,
            self.target_ref(),
            self.indirect,
        )
    }
}

fn parse_coords(value: &str) -> Result<Coords, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {value}"))?;
    let x = x.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok(Coords::new(x, y))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), RulesError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: Args) -> Result<(), RulesError> {
    load_and_install(&args.catalog)?;
    info!("(main) Loaded weapon catalog from {}.", args.catalog);

    let mut game = GameState::load_from_file(&args.scenario)?;
    if let Some(file_name) = &args.options {
        game.options = GameOptions::load_from_file(file_name)?;
    }

    let mut dice: Box<dyn Dice> = match args.seed {
        Some(seed) => {
            info!("(main) Rolling with seed {seed}.");
            Box::new(RandomSource::seeded(seed))
        }
        None => Box::new(RandomSource::from_entropy()),
    };

    debug!("(main) Running {:?}.", args.command);
    match args.command {
        Command::ToHit(attack) => {
            let ctx = attack.context(&game)?.with_front_resolved(dice.as_mut());
            let to_hit = compute_to_hit(&ctx);
            print_json(&json!({
                "to_hit": to_hit,
                "value": to_hit.value(),
                "hit_chance": to_hit.hit_chance(),
                "expected_damage": expected_damage(&ctx, &to_hit, false),
            }))
        }
        Command::Fire(attack) => {
            let ctx = attack.context(&game)?.with_front_resolved(dice.as_mut());
            let to_hit = compute_to_hit(&ctx);
            let report = resolve_attack(&ctx, &to_hit, dice.as_mut())?;
            print_json(&report)
        }
        Command::SelectAmmo(attack) => {
            let choice = select_ammo(
                &mut game,
                attack.attacker,
                attack.weapon,
                attack.target_ref(),
            )?;
            print_json(&json!({ "bin": choice }))
        }
        Command::Sensors => {
            update_sensor_contacts(&mut game, dice.as_mut());
            let contacts: BTreeMap<UnitId, _> = game
                .units
                .values()
                .map(|unit| {
                    (
                        unit.id,
                        json!({
                            "sensor_contacts": unit.sensor_contacts,
                            "firing_solutions": unit.firing_solutions,
                        }),
                    )
                })
                .collect();
            print_json(&contacts)
        }
        Command::Displace { unit, direction } => {
            let unit = game.unit(unit)?;
            let from = unit.require_position()?;
            let to = preferred_displacement(&game, unit, from, direction)?;
            print_json(&json!({ "from": from, "to": to }))
        }
        Command::Stacking { unit, to } => {
            let unit = game.unit(unit)?;
            let blocked_by = stacking_violation(&game, unit, to, None, dice.as_mut());
            print_json(&json!({ "blocked_by": blocked_by }))
        }
        Command::Spotter { attacker, target } => {
            let attacker = game.unit(attacker)?;
            let target = game.unit(target)?;
            let spotter = best_spotter(&game, attacker, target)
                .map(|(unit, modifier)| json!({ "spotter": unit.id, "modifier": modifier }));
            print_json(&spotter)
        }
    }
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("(main) {e}");
        eprintln!("hexfire: {e}");
        process::exit(1);
    }
}
