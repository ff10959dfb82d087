use clap::Parser;
use log::*;
use rand::RngCore;
use rand_mt::Mt64;

use players::PlayerType;

#[derive(Parser)]
pub struct AppArgs {
    #[clap(long, value_parser, default_value = "random")]
    player: PlayerType,

    #[clap(long, value_parser, default_value = "random")]
    opponent: PlayerType,

    #[clap(long, short = 'c', value_parser, default_value_t = 1)]
    play_cnt: u32,

    /// Print each hand's bottom card and every move as it happens.
    #[clap(long, value_parser, default_value_t = false)]
    verbose: bool,
}

fn main() {
    // Initialize env_logger with a default log level of INFO.
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = AppArgs::parse();

    // Use fixed seed for reproducible results.
    let mut rng = Mt64::new(0x42);

    let mut player = args.player.create_player("player", rng.next_u64());
    let mut opponent = args.opponent.create_player("opponent", rng.next_u64());

    run_battles(&mut *player, &mut *opponent, args.play_cnt, args.verbose);
}

pub fn run_battles(
    player: &mut dyn players::Player,
    opponent: &mut dyn players::Player,
    play_cnt: u32,
    verbose: bool,
) {
    // Use fixed seed for reproducible results.
    let mut rng = Mt64::new(0x42);

    let mut player_lost_cnt = 0;
    let mut opponent_lost_cnt = 0;
    for n in 0..play_cnt {
        let player_name = player.name().to_string();
        let opponent_name = opponent.name().to_string();
        let loser = local::run(
            &player_name,
            &opponent_name,
            player,
            opponent,
            &mut rng,
            verbose,
        );
        if loser == 0 {
            debug!("{} is the durak", player.name());
            player_lost_cnt += 1;
        } else {
            debug!("{} is the durak", opponent.name());
            opponent_lost_cnt += 1;
        }
        info!("Battle #{}. durak: {}", n, if loser == 0 { player.name() } else { opponent.name() });
        print_rate(player.name(), opponent.name(), player_lost_cnt, opponent_lost_cnt);
    }

    info!("\n* All battles have finished");
    print_rate(player.name(), opponent.name(), player_lost_cnt, opponent_lost_cnt);
}

fn print_rate(player_name: &str, opponent_name: &str, player_lost_cnt: u32, opponent_lost_cnt: u32) {
    let total = (player_lost_cnt + opponent_lost_cnt) as f32;
    info!(
        "{} durak rate: {} ({:.3})",
        player_name,
        player_lost_cnt,
        player_lost_cnt as f32 / total
    );
    info!(
        "{} durak rate: {} ({:.3})",
        opponent_name,
        opponent_lost_cnt,
        opponent_lost_cnt as f32 / total
    );
}
