use anyhow::{Context, Result};
use clap::Parser;
use geoguess::{
    config::{Config, ConfigStore, FileConfigStore},
    format::{distance_label, guess_label, points_label},
    history::HistoryDb,
    logging, project, AverageRounding, CsvDataset, DatasetError, GameSession, RoundMode,
    RoundStateMachine, ScoredRound, ShuffledTargets, TargetProvider,
};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use tracing::{info, warn};

/// guess where in the world a photo was taken
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal geography guessing game. Each round names a location image; type the latitude and longitude you think it shows and get up to 5000 points for closeness."
)]
pub struct Cli {
    /// coords.csv file with one "lat,lon" record per image
    #[clap(short = 'd', long)]
    dataset: Option<PathBuf>,

    /// directory holding the round images (0.png, 1.png, ...)
    #[clap(short = 'i', long)]
    images: Option<PathBuf>,

    /// width of the score decay curve in meters
    #[clap(long)]
    sigma: Option<f64>,

    /// how the running average is rounded after each round
    #[clap(long, value_enum)]
    rounding: Option<AverageRounding>,

    /// seed for the round order (random if omitted)
    #[clap(long)]
    seed: Option<u64>,

    /// stop after this many scored rounds
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// do not record scored rounds in the history database
    #[clap(long)]
    no_history: bool,

    /// history database path (defaults to the platform state dir)
    #[clap(long)]
    history_db: Option<PathBuf>,

    /// config file path (defaults to the platform config dir)
    #[clap(long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// verbose logging on stderr
    #[clap(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    /// Command line flags win over the config file
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(ref dataset) = self.dataset {
            cfg.dataset_path = dataset.clone();
        }
        if let Some(ref images) = self.images {
            cfg.images_dir = images.clone();
        }
        if let Some(sigma) = self.sigma {
            cfg.sigma_meters = sigma;
        }
        if let Some(rounding) = self.rounding {
            cfg.average_rounding = rounding;
        }
        if self.no_history {
            cfg.record_history = false;
        }
        cfg
    }

    fn config_store(&self) -> FileConfigStore {
        match self.config {
            Some(ref path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

enum Command<'a> {
    Quit,
    Next,
    Stats,
    Guess(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "q" | "quit" => Command::Quit,
            "n" | "next" => Command::Next,
            "s" | "stats" => Command::Stats,
            _ => Command::Guess(line),
        }
    }
}

pub struct Game {
    config: Config,
    machine: RoundStateMachine,
    session: GameSession,
    targets: ShuffledTargets<CsvDataset>,
    history: Option<HistoryDb>,
    max_rounds: Option<usize>,
}

impl Game {
    pub fn new(
        config: Config,
        targets: ShuffledTargets<CsvDataset>,
        history: Option<HistoryDb>,
        max_rounds: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            machine: config.machine()?,
            config,
            session: GameSession::new(),
            targets,
            history,
            max_rounds,
        })
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        if self.begin_round(out)? {
            for line in input.lines() {
                let line = line?;
                let keep_going = match Command::parse(&line) {
                    Command::Quit => false,
                    Command::Next => self.begin_round(out)?,
                    Command::Stats => {
                        self.print_stats(out)?;
                        true
                    }
                    Command::Guess(text) => self.guess(text, out)?,
                };
                if !keep_going {
                    break;
                }
            }
        }

        self.print_summary(out)
    }

    /// Returns false once the dataset has no more targets.
    fn begin_round<W: Write>(&mut self, out: &mut W) -> Result<bool> {
        match self.machine.start_next_round(&mut self.session, &self.targets) {
            Ok(round) => {
                let index = round.index();
                writeln!(out, "Round {}", index + 1)?;
                match self.targets.image_for(index) {
                    Some(path) => writeln!(out, "Image: {}", path.display())?,
                    None => writeln!(out, "Image: (none)")?,
                }
                writeln!(out, "Enter your guess as \"lat, lon\":")?;
                Ok(true)
            }
            Err(DatasetError::NotFound(index)) => {
                info!(index, "dataset exhausted");
                writeln!(out, "No more locations.")?;
                Ok(false)
            }
            Err(e) => Err(e).context("failed to start round"),
        }
    }

    fn guess<W: Write>(&mut self, text: &str, out: &mut W) -> Result<bool> {
        if *self.session.mode() == RoundMode::Scored {
            // blank line moves on, anything else is a repeat guess
            if text.trim().is_empty() {
                return self.begin_round(out);
            }
            writeln!(out, "Round already scored. Press Enter or type 'n' for the next round.")?;
            return Ok(true);
        }

        match self.machine.submit_guess(&mut self.session, text) {
            Ok(Some(scored)) => {
                self.print_scoreboard(&scored, out)?;
                self.record(&scored);
                let done = self
                    .max_rounds
                    .is_some_and(|max| self.session.round_count() >= max);
                Ok(!done)
            }
            Ok(None) => Ok(true),
            Err(e) => {
                writeln!(out, "Error: {e}")?;
                self.machine.acknowledge_error(&mut self.session);
                Ok(true)
            }
        }
    }

    fn record(&self, scored: &ScoredRound) {
        if let Some(ref db) = self.history {
            if let Err(e) = db.record_round(scored) {
                warn!(error = %e, "could not record round");
            }
        }
    }

    fn print_scoreboard<W: Write>(&self, scored: &ScoredRound, out: &mut W) -> Result<()> {
        let (w, h) = (self.config.map_width_px, self.config.map_height_px);
        let guess_px = project(&scored.guess, w, h);
        let target_px = project(&scored.target, w, h);

        writeln!(out, "{}", guess_label(&scored.guess))?;
        writeln!(out, "Answer: {}", scored.target)?;
        writeln!(out, "Distance: {}", distance_label(scored.distance_meters))?;
        writeln!(out, "Round Score: {}", points_label(scored.score as f64))?;
        writeln!(out, "Average Score: {}", points_label(scored.running_average))?;
        writeln!(
            out,
            "Map ({w}x{h}): guess at ({:.0}, {:.0}), answer at ({:.0}, {:.0})",
            guess_px.x, guess_px.y, target_px.x, target_px.y
        )?;
        writeln!(out, "Press Enter or type 'n' for the next round.")?;
        Ok(())
    }

    fn print_stats<W: Write>(&self, out: &mut W) -> Result<()> {
        let Some(ref db) = self.history else {
            writeln!(out, "History is disabled.")?;
            return Ok(());
        };
        let stats = db
            .lifetime_summary()
            .and_then(|lifetime| db.recent_rounds(5).map(|recent| (lifetime, recent)));
        let (lifetime, recent) = match stats {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "could not read history");
                writeln!(out, "History unavailable.")?;
                return Ok(());
            }
        };
        writeln!(out, "Lifetime rounds: {}", lifetime.rounds)?;
        writeln!(out, "Lifetime average: {}", points_label(lifetime.average_score))?;
        if let Some(best) = lifetime.best_score {
            writeln!(out, "Best round: {}", points_label(best as f64))?;
        }
        for record in recent {
            writeln!(
                out,
                "  {}  {}  {}",
                record.played_at.format("%Y-%m-%d %H:%M"),
                distance_label(record.distance_meters),
                points_label(record.score as f64)
            )?;
        }
        Ok(())
    }

    fn print_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        let summary = self.session.summary();
        writeln!(out, "Rounds played: {}", summary.round_count)?;
        writeln!(out, "Average Score: {}", points_label(summary.running_average))?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let store = cli.config_store();
    let config = cli.apply(store.load());
    config.validate()?;
    if cli.save_config {
        store.save(&config)?;
        info!(path = %store.path().display(), "saved config");
    }

    let dataset = CsvDataset::load(&config.dataset_path, &config.images_dir).with_context(|| {
        format!(
            "could not load dataset from {}",
            config.dataset_path.display()
        )
    })?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(entries = dataset.len(), seed, "starting game");
    let targets = ShuffledTargets::new(dataset, seed);

    let history = if config.record_history {
        let opened = match cli.history_db {
            Some(ref path) => HistoryDb::open(path),
            None => HistoryDb::open_default(),
        };
        match opened {
            Ok(db) => Some(db),
            Err(e) => {
                warn!(error = %e, "history disabled");
                None
            }
        }
    } else {
        None
    };

    let mut game = Game::new(config, targets, history, cli.rounds)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    game.run(stdin.lock(), &mut stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoguess::Location;

    fn game_with(locations: &str, max_rounds: Option<usize>, history: Option<HistoryDb>) -> Game {
        let dataset = CsvDataset::from_reader(locations.as_bytes()).unwrap();
        let cfg = Config {
            record_history: history.is_some(),
            ..Config::default()
        };
        Game::new(cfg, ShuffledTargets::new(dataset, 42), history, max_rounds).unwrap()
    }

    fn play(game: &mut Game, input: &str) -> String {
        let mut out = Vec::new();
        game.run(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["geoguess"]);
        assert_eq!(cli.dataset, None);
        assert_eq!(cli.sigma, None);
        assert_eq!(cli.rounding, None);
        assert!(!cli.no_history);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "geoguess",
            "--dataset",
            "d.csv",
            "--images",
            "imgs",
            "--sigma",
            "500000",
            "--rounding",
            "round-each-update",
            "--no-history",
        ]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.dataset_path, PathBuf::from("d.csv"));
        assert_eq!(cfg.images_dir, PathBuf::from("imgs"));
        assert_eq!(cfg.sigma_meters, 500_000.0);
        assert_eq!(cfg.average_rounding, AverageRounding::RoundEachUpdate);
        assert!(!cfg.record_history);
    }

    #[test]
    fn test_cli_keeps_config_when_flags_absent() {
        let cfg = Config {
            sigma_meters: 2_500_000.0,
            ..Config::default()
        };
        let applied = Cli::parse_from(["geoguess"]).apply(cfg.clone());
        assert_eq!(applied, cfg);
    }

    #[test]
    fn test_command_parse() {
        assert!(matches!(Command::parse("q"), Command::Quit));
        assert!(matches!(Command::parse(" quit "), Command::Quit));
        assert!(matches!(Command::parse("n"), Command::Next));
        assert!(matches!(Command::parse("stats"), Command::Stats));
        assert!(matches!(Command::parse("1 2"), Command::Guess("1 2")));
    }

    #[test]
    fn test_perfect_guess_then_exhausted() {
        let mut game = game_with("40.7128,-74.0060\n", None, None);
        let out = play(&mut game, "40.7128, -74.0060\n\n");

        assert!(out.contains("Round 1"));
        assert!(out.contains("Distance: 0.0 km"));
        assert!(out.contains("Round Score: 5000 points"));
        assert!(out.contains("No more locations."));
        assert!(out.contains("Rounds played: 1"));
    }

    #[test]
    fn test_error_then_retry() {
        let mut game = game_with("40.7128,-74.0060\n", None, None);
        let out = play(&mut game, "abc, 5\n91 0\n42.3601 -71.0589\nq\n");

        assert!(out.contains("Error: 'abc' is not a number."));
        assert!(out.contains("Error: Invalid coordinate ranges"));
        assert!(out.contains("Answer: (40.7128, -74.0060)"));
        assert!(out.contains("Rounds played: 1"));
    }

    #[test]
    fn test_repeat_guess_is_ignored() {
        let mut game = game_with("0,0\n0,0\n", None, None);
        let out = play(&mut game, "0 0\n5 5\nq\n");
        assert!(out.contains("Round already scored."));
        assert_eq!(game.session.round_count(), 1);
        assert_eq!(game.session.running_average(), 5000.0);
    }

    #[test]
    fn test_max_rounds_stops_game() {
        let mut game = game_with("0,0\n10,10\n20,20\n", Some(1), None);
        let out = play(&mut game, "0 0\n\n0 0\n");
        assert_eq!(game.session.round_count(), 1);
        assert!(!out.contains("Round 2"));
    }

    #[test]
    fn test_skip_round_with_next() {
        let mut game = game_with("0,0\n10,10\n", None, None);
        let out = play(&mut game, "n\nq\n");
        assert!(out.contains("Round 2"));
        assert_eq!(game.session.round_count(), 0);
        assert_eq!(game.session.rounds().len(), 2);
    }

    #[test]
    fn test_history_recorded_and_stats_printed() {
        let db = HistoryDb::open_in_memory().unwrap();
        let mut game = game_with("0,0\n", None, Some(db));
        let out = play(&mut game, "0 0\nstats\nq\n");

        assert!(out.contains("Lifetime rounds: 1"));
        assert!(out.contains("Best round: 5000 points"));
        let recorded = game.history.as_ref().unwrap().recent_rounds(1).unwrap();
        assert_eq!(recorded[0].target, Location::new(0.0, 0.0).unwrap());
    }

    #[test]
    fn test_stats_without_history() {
        let mut game = game_with("0,0\n", None, None);
        let out = play(&mut game, "s\nq\n");
        assert!(out.contains("History is disabled."));
    }

    #[test]
    fn test_unreadable_history_keeps_session_going() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let db = HistoryDb::open(&path).unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE rounds", [])
            .unwrap();

        let mut game = game_with("0,0\n0,0\n", None, Some(db));
        let out = play(&mut game, "s\n0 0\n\n0 0\nq\n");

        assert!(out.contains("History unavailable."));
        assert!(out.contains("Round 2"));
        assert!(out.contains("Rounds played: 2"));
    }

    #[test]
    fn test_empty_dataset_ends_immediately() {
        let mut game = game_with("", None, None);
        let out = play(&mut game, "0 0\n");
        assert!(out.contains("No more locations."));
        assert!(out.contains("Rounds played: 0"));
    }
}
