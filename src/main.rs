use clap::{Arg, ArgMatches, Command, value_parser};
use smokesim::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use smokesim::scenario::{Engagement, ScenarioConfig};
use smokesim::simulation::{InterferenceResult, InterferenceSimulation};
use tracing::info;

fn main() {
    let matches = build_cli().get_matches();

    let _log_guard = match configure_logging(&matches) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&matches) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("smokesim")
        .version("0.1.0")
        .about("煙幕遮蔽シミュレーション (Smoke Obscuration Simulation)")
        .long_about("航空機が投下した煙幕弾の雲が、来襲ミサイルから防護対象への視線を\n\
                     完全に遮る合計時間を固定時間刻みの数値積分で求めます。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みの基準シナリオで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("missile")
                .long("missile")
                .value_name("ID")
                .help("評価するミサイルID (例: M1)")
        )
        .arg(
            Arg::new("aircraft")
                .long("aircraft")
                .value_name("ID")
                .help("煙幕弾を投下する航空機ID (例: FY1)")
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .value_name("MPS")
                .value_parser(value_parser!(f64))
                .help("航空機の速さ (m/s)")
        )
        .arg(
            Arg::new("drop")
                .long("drop")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("飛行開始から投下までの時間 (s)")
        )
        .arg(
            Arg::new("explode")
                .long("explode")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("投下から起爆までの時間 (s)")
        )
        .arg(
            Arg::new("dt")
                .long("dt")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("積分の時間刻み (s)")
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("並列ワーカー数 (1 で逐次実行)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
}

fn configure_logging(
    matches: &ArgMatches,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level)?,
        None => level_from_verbosity(matches.get_count("verbose")),
    };
    let output = match matches.get_one::<String>("log-output") {
        Some(output) => output.parse::<LogOutput>()?,
        None => LogOutput::Console,
    };

    let config = LogConfig { level, output, ..LogConfig::default() };
    Ok(init_logging(&config)?)
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            info!("シナリオファイル読み込み完了: {}", path);
            scenario
        }
        None => ScenarioConfig::builtin(),
    };

    apply_overrides(&mut scenario, matches);
    scenario.validate()?;

    if matches.get_flag("info") {
        scenario.print_summary();
        return Ok(());
    }

    let engagement = scenario.resolve()?;
    let result = InterferenceSimulation::new(engagement.params, engagement.precision)?
        .run(engagement.aircraft_velocity, engagement.plan)?;

    print_report(&engagement, &result, matches.get_count("verbose"));
    Ok(())
}

/// コマンドライン引数でシナリオの交戦条件を上書き
fn apply_overrides(scenario: &mut ScenarioConfig, matches: &ArgMatches) {
    if let Some(id) = matches.get_one::<String>("missile") {
        scenario.engagement.missile_id = id.clone();
    }
    if let Some(id) = matches.get_one::<String>("aircraft") {
        scenario.engagement.aircraft_id = id.clone();
    }
    if let Some(&speed) = matches.get_one::<f64>("speed") {
        scenario.engagement.speed_mps = speed;
    }
    if let Some(&drop) = matches.get_one::<f64>("drop") {
        scenario.engagement.drop_s = drop;
    }
    if let Some(&explode) = matches.get_one::<f64>("explode") {
        scenario.engagement.explode_delay_s = explode;
    }
    if let Some(&dt) = matches.get_one::<f64>("dt") {
        scenario.sim.dt_s = dt;
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        scenario.sim.workers = workers;
    }
}

fn print_report(engagement: &Engagement, result: &InterferenceResult, verbose_level: u8) {
    let origin = engagement.params.aircraft_origin;
    let v = engagement.aircraft_velocity;

    println!("航空機初期位置: ({}, {}, {})", origin.x, origin.y, origin.z);
    println!("航空機速度ベクトル: ({:.2}, {:.2}, {:.2}) m/s", v.x, v.y, v.z);
    println!("投下時刻: {} s", engagement.plan.drop_t);
    println!("起爆間隔: {} s", engagement.plan.explode_t);
    println!("{}", "-".repeat(30));
    println!("ミサイルが妨害された合計時間: {:.4} 秒", result.duration);

    if verbose_level > 0 {
        let det = result.detonation_position;
        println!();
        println!("起爆時刻: {:.3} s / 消散時刻: {:.3} s", result.t_explode, result.t_dissipate);
        println!("起爆位置: ({:.3}, {:.3}, {:.3})", det.x, det.y, det.z);
        println!(
            "遮蔽サンプル: {} / {} (Δt = {} s)",
            result.occluded_steps, result.total_steps, result.dt
        );
        if let (Some(first), Some(last)) = (result.first_occluded_t, result.last_occluded_t) {
            println!("遮蔽区間: {:.4} s 〜 {:.4} s", first, last + result.dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_overrides_applied() {
        let matches = build_cli().get_matches_from([
            "smokesim", "--aircraft", "FY2", "--speed", "100", "--drop", "2.0", "--explode", "1.0", "--dt", "0.01",
            "--workers", "4",
        ]);
        let mut scenario = ScenarioConfig::builtin();
        apply_overrides(&mut scenario, &matches);

        assert_eq!(scenario.engagement.aircraft_id, "FY2");
        assert_eq!(scenario.engagement.missile_id, "M1");
        assert_eq!(scenario.engagement.speed_mps, 100.0);
        assert_eq!(scenario.engagement.drop_s, 2.0);
        assert_eq!(scenario.engagement.explode_delay_s, 1.0);
        assert_eq!(scenario.sim.dt_s, 0.01);
        assert_eq!(scenario.sim.workers, 4);
        assert!(scenario.validate().is_ok());
    }
}
