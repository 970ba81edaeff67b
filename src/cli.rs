use crate::{Error, Result};

pub const DEFAULT_RECORDS_LIMIT: usize = 10;

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub topic: Option<String>,
    pub client_id: Option<String>,
    pub threshold: Option<f64>,
    pub tick_ms: Option<u64>,
    pub history: Option<usize>,
    pub store: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub no_synthetic: bool,
    pub offline: bool,
}

/// Options for the `records` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsOptions {
    pub limit: usize,
    pub store: Option<String>,
}

impl Default for RecordsOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECORDS_LIMIT,
            store: None,
        }
    }
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Box<RunOptions>),
    Records(RecordsOptions),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(Box::default())),
            Some("run") => Ok(Command::Run(Box::new(parse_run_options(&mut iter)?))),
            Some("records") => Ok(Command::Records(parse_records_options(&mut iter)?)),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` may be omitted: hand every arg to the run parser.
                let mut iter = args.iter();
                Ok(Command::Run(Box::new(parse_run_options(&mut iter)?)))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "coolrelay - temperature telemetry and cooling relay daemon\n",
            "\n",
            "USAGE:\n",
            "  coolrelay run [OPTIONS]\n",
            "  coolrelay records [--limit <n>] [--store <path>]\n",
            "  coolrelay --help\n",
            "  coolrelay --version\n",
            "\n",
            "RUN OPTIONS:\n",
            "  --host <host>        MQTT broker host (default: broker.hivemq.com)\n",
            "  --port <number>      MQTT broker port (default: 1883)\n",
            "  --topic <topic>      Topic for telemetry and control (default: gym/project)\n",
            "  --client-id <id>     MQTT client id (default: AC_Client)\n",
            "  --threshold <c>      Relay-on temperature in C (default: 30.0)\n",
            "  --tick-ms <number>   Control tick interval in ms (default: 5000)\n",
            "  --history <number>   Samples kept for plotting (default: 200)\n",
            "  --store <path>       Record log path (default: sensor_data.jsonl)\n",
            "  --no-synthetic       Do not publish synthetic sensor readings\n",
            "  --offline            Loop published messages back locally instead of using a broker\n",
            "  --log-level <level>  error|warn|info|debug|trace (default: info)\n",
            "  --log-file <path>    Also append log lines to this file\n",
            "\n",
            "CONSOLE (stdin while running):\n",
            "  press | override on|off | records [n] | status | quit | help\n",
            "\n",
            "  -h, --help           Show this help\n",
            "  -V, --version        Show version\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--host" => opts.host = Some(take_value(flag, iter)?),
            "--port" => opts.port = Some(parse_number(flag, iter, "port must be 1-65535")?),
            "--topic" => opts.topic = Some(take_value(flag, iter)?),
            "--client-id" => opts.client_id = Some(take_value(flag, iter)?),
            "--threshold" => {
                opts.threshold = Some(parse_number(flag, iter, "threshold must be a number")?)
            }
            "--tick-ms" => {
                opts.tick_ms = Some(parse_number(flag, iter, "tick-ms must be a positive integer")?)
            }
            "--history" => {
                opts.history = Some(parse_number(flag, iter, "history must be a positive integer")?)
            }
            "--store" => opts.store = Some(take_value(flag, iter)?),
            "--log-level" => opts.log_level = Some(take_value(flag, iter)?),
            "--log-file" => opts.log_file = Some(take_value(flag, iter)?),
            "--no-synthetic" => opts.no_synthetic = true,
            "--offline" => opts.offline = true,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn parse_records_options(iter: &mut std::slice::Iter<String>) -> Result<RecordsOptions> {
    let mut opts = RecordsOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--limit" => {
                opts.limit = parse_number(flag, iter, "limit must be a positive integer")?;
                if opts.limit == 0 {
                    return Err(Error::InvalidArgs("limit must be a positive integer".into()));
                }
            }
            "--store" => opts.store = Some(take_value(flag, iter)?),
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn parse_number<T: std::str::FromStr>(
    flag: &str,
    iter: &mut std::slice::Iter<String>,
    message: &str,
) -> Result<T> {
    take_value(flag, iter)?
        .parse()
        .map_err(|_| Error::InvalidArgs(message.to_string()))
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}
