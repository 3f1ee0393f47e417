use std::process::exit;

use anyhow::anyhow;
use clap::{crate_authors, crate_version, App as ClapApp, Arg, ArgMatches};
use env_logger::Env;
use tokio::runtime::Runtime;

use hyperion_client::{
    connect, execute_args_async, CommandResponse, Error, InstrumentAddress, StreamingDataReader, StreamingMode,
};
use hyperion_protocol::{decode_sensor_list, Dataset, PeakData, SensorData, SpectrumData};

const EXPORT_SENSORS: &str = "#ExportSensors";

fn main() {
    let matches = ClapApp::new("Hyperion instrument client")
        .author(crate_authors!())
        .version(crate_version!())
        .about("Execute commands and read data streams of a Hyperion instrument")
        .arg(
            Arg::with_name("host")
                .long("host")
                .takes_value(true)
                .help("Host name or IP address of the instrument."),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON file with the instrument address and ports."),
        )
        .arg(Arg::with_name("verbose").long("verbose").short('v').help("Log verbose output"))
        .subcommand(
            ClapApp::new("exec")
                .about("Execute a command and print the response")
                .arg(Arg::with_name("name").required(true).help("Command name, e.g. #GetSerialNumber"))
                .arg(
                    Arg::with_name("args")
                        .multiple_values(true)
                        .help("Arguments, joined with spaces"),
                ),
        )
        .subcommand(
            ClapApp::new("stream")
                .about("Print datasets of a streaming connection")
                .arg(
                    Arg::with_name("mode")
                        .required(true)
                        .possible_values(["peaks", "spectrum", "sensor"]),
                )
                .arg(
                    Arg::with_name("count")
                        .long("count")
                        .short('n')
                        .takes_value(true)
                        .help("Number of datasets to read, reads forever if omitted"),
                ),
        )
        .subcommand(ClapApp::new("sensors").about("Print the sensors defined on the instrument"))
        .get_matches();

    let verbose = matches.is_present("verbose");
    if verbose {
        env_logger::Builder::from_env(Env::default().default_filter_or("hyperion=debug")).init();
    } else {
        env_logger::init();
    }

    let addr = match instrument_address(&matches) {
        Ok(addr) => addr,
        Err(err) => {
            println!("{}", err);
            exit(1);
        }
    };
    log::debug!("instrument: {:?}", addr);

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            println!("Cannot start runtime: {}", err);
            exit(1);
        }
    };
    let ret = rt.block_on(async move {
        match matches.subcommand() {
            Some(("exec", sub)) => exec(&addr, sub).await,
            Some(("stream", sub)) => stream(&addr, sub).await,
            Some(("sensors", _)) => sensors(&addr).await,
            _ => Err(Error::argument(anyhow!("No command given, see --help"))),
        }
    });
    if let Err(err) = ret {
        println!("{}", err);
        exit(1);
    }
}

fn instrument_address(matches: &ArgMatches) -> hyperion_client::Result<InstrumentAddress> {
    let mut addr = match matches.value_of("config") {
        Some(path) => InstrumentAddress::load(path)?,
        None => match matches.value_of("host") {
            Some(host) => InstrumentAddress::new(host),
            None => return Err(Error::argument(anyhow!("Either --host or --config is required."))),
        },
    };
    if let (Some(host), Some(_)) = (matches.value_of("host"), matches.value_of("config")) {
        addr.host = host.to_string();
    }
    Ok(addr)
}

fn print_response(response: &CommandResponse) {
    println!("status: {:?}", response.status());
    println!("message: {}", response.message());
    if !response.content().is_empty() {
        println!("content ({} bytes): {}", response.content().len(), response.content_as_string());
    }
}

async fn exec(addr: &InstrumentAddress, matches: &ArgMatches) -> hyperion_client::Result<()> {
    let name = matches
        .value_of("name")
        .ok_or_else(|| Error::argument(anyhow!("Missing command name")))?;
    let args: Vec<&str> = matches.values_of("args").map(|x| x.collect()).unwrap_or_default();
    let mut stream = connect(addr, addr.command_port).await?;
    let response = execute_args_async(&mut stream, name, args.as_slice()).await?;
    print_response(&response);
    Ok(())
}

async fn stream(addr: &InstrumentAddress, matches: &ArgMatches) -> hyperion_client::Result<()> {
    let mode: StreamingMode = matches
        .value_of("mode")
        .ok_or_else(|| Error::argument(anyhow!("Missing streaming mode")))?
        .parse()?;
    let count = match matches.value_of("count") {
        Some(x) => Some(
            x.parse::<u64>()
                .map_err(|_| Error::argument(anyhow!("Cannot parse `{}` as a count.", x)))?,
        ),
        None => None,
    };

    let mut stream = connect(addr, addr.port_for(mode)).await?;
    let mut reader = StreamingDataReader::new(mode);
    let mut num_read = 0_u64;
    while count.map(|x| num_read < x).unwrap_or(true) {
        let data = reader.read_next_async(&mut stream).await?;
        match mode {
            StreamingMode::Peaks => print_peaks(&PeakData::new(data)?),
            StreamingMode::Spectrum => print_spectrum(&SpectrumData::new(data)?)?,
            StreamingMode::Sensor => print_sensors(&SensorData::new(data)?),
        }
        num_read += 1;
    }
    Ok(())
}

fn print_header<T: Dataset>(data: &T) {
    println!(
        "#{} {} (buffer {}% available)",
        data.serial_number(),
        data.timestamp().to_rfc3339(),
        data.available_buffer_percentage()
    );
}

fn print_peaks(data: &PeakData) {
    print_header(data);
    for (idx, count) in data.peak_counts().iter().enumerate() {
        if *count > 0 {
            println!("  channel {}: {} peaks", idx + 1, count);
        }
    }
}

fn print_spectrum(data: &SpectrumData) -> hyperion_client::Result<()> {
    print_header(data);
    for channel in 1..=data.channel_count() {
        let (idx, max) = data
            .iter(channel)?
            .enumerate()
            .max_by_key(|(_, x)| *x)
            .unwrap_or((0, 0));
        println!(
            "  channel {}: max amplitude {} at {:.3} nm",
            channel,
            max,
            data.wavelength(idx)
        );
    }
    Ok(())
}

fn print_sensors(data: &SensorData) {
    print_header(data);
    let values: Vec<String> = data.iter().map(|x| format!("{:.6}", x)).collect();
    println!("  {}", values.join(" "));
}

async fn sensors(addr: &InstrumentAddress) -> hyperion_client::Result<()> {
    let mut stream = connect(addr, addr.command_port).await?;
    let response = execute_args_async::<_, &str>(&mut stream, EXPORT_SENSORS, &[]).await?;
    if !response.is_success() {
        print_response(&response);
        return Ok(());
    }
    let export = decode_sensor_list(response.content())?;
    println!("export version {}, {} sensors", export.version, export.count);
    for sensor in &export.sensors {
        match sensor {
            Ok(sensor) => {
                let json = serde_json::to_string_pretty(sensor)
                    .map_err(|x| Error::argument(anyhow!("Cannot format sensor: {}", x)))?;
                println!("{}", json);
            }
            Err(err) => println!("undecodable sensor: {}", err),
        }
    }
    Ok(())
}
