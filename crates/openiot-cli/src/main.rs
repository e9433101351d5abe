// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use log::debug;
use openiot_client::{
    Client, ClientConfig, ConfigOverrides, Device, Error, Image, RangeQuery, Rawdata, Record,
    Sensor, Sheet, now,
};
use std::{collections::HashMap, path::PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OpenIoT Server Host
    #[clap(long, env = "OPENIOT_HOST")]
    host: Option<String>,

    /// OpenIoT Server Port
    #[clap(long, env = "OPENIOT_PORT")]
    port: Option<u16>,

    /// Project API Key
    #[clap(long, env = "OPENIOT_API_KEY")]
    api_key: Option<String>,

    /// Connect using HTTPS
    #[clap(long, env = "OPENIOT_TLS")]
    tls: bool,

    /// Request timeout in milliseconds, 0 disables the timeout
    #[clap(long, env = "OPENIOT_TIMEOUT")]
    timeout: Option<u64>,

    /// Configuration file, defaults to config.toml in the user configuration
    /// directory.  Values from the file are overridden by OPENIOT_* variables
    /// and by the options above.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Client Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Print the current time in the service timestamp format.
    Now,
    /// List all devices of the project bound to the API key.
    Devices,
    /// Retrieve the device with the provided ID.
    Device {
        /// Device ID
        device_id: String,
    },
    /// Create a new device, the device ID is assigned by the server.
    CreateDevice {
        /// Device name
        name: String,

        /// Device description
        #[clap(long)]
        desc: Option<String>,

        /// Device type
        #[clap(long)]
        kind: Option<String>,

        /// Device URI
        #[clap(long)]
        uri: Option<String>,

        /// Latitude
        #[clap(long, requires = "lon")]
        lat: Option<f64>,

        /// Longitude
        #[clap(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Update a device, only the provided fields are changed.
    ModifyDevice {
        /// Device ID
        device_id: String,

        /// Device name
        #[clap(long)]
        name: Option<String>,

        /// Device description
        #[clap(long)]
        desc: Option<String>,

        /// Device type
        #[clap(long)]
        kind: Option<String>,

        /// Device URI
        #[clap(long)]
        uri: Option<String>,

        /// Latitude
        #[clap(long, requires = "lon")]
        lat: Option<f64>,

        /// Longitude
        #[clap(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Delete the device with the provided ID.
    DeleteDevice {
        /// Device ID
        device_id: String,
    },
    /// List the sensors of a device.
    Sensors {
        /// Device ID
        device_id: String,
    },
    /// Retrieve a sensor.
    Sensor {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,
    },
    /// Create a sensor, the sensor ID is chosen by the caller and cannot be
    /// changed afterwards.
    CreateSensor {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// Sensor name
        #[clap(long)]
        name: Option<String>,

        /// Sensor description
        #[clap(long)]
        desc: Option<String>,

        /// Sensor type such as gauge, counter, switch, snapshot or text
        #[clap(long)]
        kind: Option<String>,

        /// Measurement unit
        #[clap(long)]
        unit: Option<String>,
    },
    /// Update a sensor, only the provided fields are changed.
    ModifySensor {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// Sensor name
        #[clap(long)]
        name: Option<String>,

        /// Sensor description
        #[clap(long)]
        desc: Option<String>,

        /// Sensor type such as gauge, counter, switch, snapshot or text
        #[clap(long)]
        kind: Option<String>,

        /// Measurement unit
        #[clap(long)]
        unit: Option<String>,
    },
    /// Delete a sensor.
    DeleteSensor {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,
    },
    /// Store a sample for a sensor.  When no time is given the server stamps
    /// the sample on arrival.
    SaveRawdata {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// Sample values
        #[clap(required = true)]
        values: Vec<String>,

        /// ISO-8601 timestamp
        #[clap(long)]
        time: Option<String>,

        /// Latitude
        #[clap(long, requires = "lon")]
        lat: Option<f32>,

        /// Longitude
        #[clap(long, requires = "lat")]
        lon: Option<f32>,
    },
    /// Retrieve the latest sample of a sensor, or the samples within a time
    /// range when any of --start, --end or --interval is provided.
    Rawdata {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,

        /// Sampling interval in minutes
        #[clap(long)]
        interval: Option<u32>,
    },
    /// Delete the samples of a sensor within a time range.
    DeleteRawdata {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,
    },
    /// Upload an image as a snapshot of a sensor.  The content type is
    /// detected from the file content unless provided.
    UploadSnapshot {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// Image file
        path: PathBuf,

        /// Sample values stored with the snapshot
        values: Vec<String>,

        /// Name of the image part, defaults to the file name
        #[clap(long)]
        name: Option<String>,

        /// Image MIME type such as image/png or image/jpeg
        #[clap(long)]
        content_type: Option<String>,

        /// ISO-8601 timestamp
        #[clap(long)]
        time: Option<String>,

        /// Latitude
        #[clap(long, requires = "lon")]
        lat: Option<f32>,

        /// Longitude
        #[clap(long, requires = "lat")]
        lon: Option<f32>,
    },
    /// Retrieve the meta data of the latest snapshot, or of the snapshots
    /// within a time range when --start or --end is provided.
    SnapshotMeta {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,
    },
    /// Download a snapshot image, the latest one unless an image ID is
    /// provided.
    DownloadSnapshot {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// Snapshot image ID as found in the snapshot meta data
        #[clap(long)]
        image_id: Option<String>,

        /// Output file path, otherwise the image is written to the current
        /// working directory named after the image ID.
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Delete the snapshots of a sensor within a time range.
    DeleteSnapshot {
        /// Device ID
        device_id: String,

        /// Sensor ID
        sensor_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,
    },
    /// List the sheets of a device.
    Sheets {
        /// Device ID
        device_id: String,
    },
    /// Retrieve a sheet definition.
    Sheet {
        /// Device ID
        device_id: String,

        /// Sheet ID
        sheet_id: String,
    },
    /// Declare a sheet from a JSON definition file.
    DeclareSheet {
        /// Device ID
        device_id: String,

        /// Sheet definition (JSON)
        path: PathBuf,
    },
    /// Delete a sheet.
    DeleteSheet {
        /// Device ID
        device_id: String,

        /// Sheet ID
        sheet_id: String,
    },
    /// Store a record into a sheet.
    SaveRecord {
        /// Device ID
        device_id: String,

        /// Sheet ID
        sheet_id: String,

        /// Record fields as name=value pairs
        #[clap(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// ISO-8601 timestamp
        #[clap(long)]
        time: Option<String>,
    },
    /// Retrieve the latest record of a sheet, or the records within a time
    /// range when any of --start, --end or --interval is provided.
    Records {
        /// Device ID
        device_id: String,

        /// Sheet ID
        sheet_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,

        /// Sampling interval in minutes
        #[clap(long)]
        interval: Option<u32>,
    },
    /// Delete the records of a sheet within a time range.
    DeleteRecords {
        /// Device ID
        device_id: String,

        /// Sheet ID
        sheet_id: String,

        /// ISO-8601 start timestamp
        #[clap(long)]
        start: Option<String>,

        /// ISO-8601 end timestamp
        #[clap(long)]
        end: Option<String>,
    },
    /// Ask the server to reconfigure the equipment with the serial number.
    Reconfigure {
        /// Equipment serial number
        serial_id: String,

        /// Provisioning digest
        digest: String,
    },
    /// Ask the server to bind the equipment to another device ID.
    SetDeviceId {
        /// Equipment serial number
        serial_id: String,

        /// Provisioning digest
        digest: String,

        /// New device ID
        device_id: String,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected name=value, got '{}'", s)),
    }
}

/// Builds a range from the optional bounds.  Returns `None` when nothing was
/// provided so the caller can fall back to the latest value.
fn range(start: Option<String>, end: Option<String>, interval: Option<u32>) -> Option<RangeQuery> {
    if start.is_none() && end.is_none() && interval.is_none() {
        return None;
    }

    let mut query = RangeQuery::new();
    if let Some(start) = start {
        query = query.start(start);
    }
    if let Some(end) = end {
        query = query.end(end);
    }
    if let Some(interval) = interval {
        query = query.interval(interval);
    }
    Some(query)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(Error::Encoding)?
    );
    Ok(())
}

fn client_config(args: &Args) -> Result<ClientConfig, Error> {
    let overrides = ConfigOverrides {
        host: args.host.clone(),
        port: args.port,
        api_key: args.api_key.clone(),
        tls: args.tls.then_some(true),
        timeout: args.timeout,
    };
    ClientConfig::load_with_overrides(args.config.as_deref(), &overrides)
}

// Command handler functions

async fn handle_devices(client: &Client) -> Result<(), Error> {
    for device in client.devices().await? {
        println!("{}", device);
    }
    Ok(())
}

async fn handle_create_device(
    client: &Client,
    name: String,
    desc: Option<String>,
    kind: Option<String>,
    uri: Option<String>,
    location: Option<(f64, f64)>,
) -> Result<(), Error> {
    let mut device = Device::new(name);
    device.desc = desc;
    device.kind = kind;
    device.uri = uri;
    if let Some((lat, lon)) = location {
        device = device.with_location(lat, lon);
    }

    let device = client.save_device(&device).await?;
    println!("{}", device.id().unwrap_or_default());
    Ok(())
}

async fn handle_modify_device(
    client: &Client,
    device_id: &str,
    changes: Device,
) -> Result<(), Error> {
    let mut device = client.device(device_id).await?;
    if changes.name.is_some() {
        device.name = changes.name;
    }
    if changes.desc.is_some() {
        device.desc = changes.desc;
    }
    if changes.kind.is_some() {
        device.kind = changes.kind;
    }
    if changes.uri.is_some() {
        device.uri = changes.uri;
    }
    if let Some((lat, lon)) = changes.lat.zip(changes.lon) {
        device = device.with_location(lat, lon);
    }

    client.modify_device(&device).await?;
    println!("Modified device {}", device);
    Ok(())
}

async fn handle_sensors(client: &Client, device_id: &str) -> Result<(), Error> {
    for sensor in client.sensors(device_id).await? {
        println!("{}", sensor);
    }
    Ok(())
}

async fn handle_create_sensor(
    client: &Client,
    device_id: &str,
    sensor: Sensor,
) -> Result<(), Error> {
    let sensor = client.save_sensor(device_id, &sensor).await?;
    println!("Created sensor {}", sensor);
    Ok(())
}

async fn handle_modify_sensor(
    client: &Client,
    device_id: &str,
    sensor_id: &str,
    changes: Sensor,
) -> Result<(), Error> {
    let mut sensor = client.sensor(device_id, sensor_id).await?;
    if changes.name.is_some() {
        sensor.name = changes.name;
    }
    if changes.desc.is_some() {
        sensor.desc = changes.desc;
    }
    if changes.kind.is_some() {
        sensor.kind = changes.kind;
    }
    if changes.unit.is_some() {
        sensor.unit = changes.unit;
    }

    client.modify_sensor(device_id, &sensor).await?;
    println!("Modified sensor {}", sensor);
    Ok(())
}

async fn handle_rawdata(
    client: &Client,
    device_id: &str,
    sensor_id: &str,
    range: Option<RangeQuery>,
) -> Result<(), Error> {
    match range {
        Some(range) => print_json(&client.rawdatas(device_id, sensor_id, &range).await?),
        None => print_json(&client.rawdata(device_id, sensor_id).await?),
    }
}

async fn handle_upload_snapshot(
    client: &Client,
    device_id: &str,
    sample: Rawdata,
    path: PathBuf,
    name: Option<String>,
    content_type: Option<String>,
) -> Result<(), Error> {
    let body = tokio::fs::read(&path).await?;

    let content_type = match content_type {
        Some(content_type) => content_type,
        None => infer::get(&body)
            .map(|kind| kind.mime_type().to_owned())
            .unwrap_or_else(|| "application/octet-stream".to_owned()),
    };

    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidParameters(format!("no file name in {:?}", path)))?,
    };

    debug!(
        "Uploading {:?} as {} ({}, {} bytes)",
        path,
        name,
        content_type,
        body.len()
    );

    client
        .save_snapshot(device_id, &sample, Image::new(name, content_type, body))
        .await?;
    println!("Uploaded snapshot {:?}", path);
    Ok(())
}

async fn handle_snapshot_meta(
    client: &Client,
    device_id: &str,
    sensor_id: &str,
    range: Option<RangeQuery>,
) -> Result<(), Error> {
    match range {
        Some(range) => print_json(&client.snapshot_metas(device_id, sensor_id, &range).await?),
        None => print_json(&client.snapshot_meta(device_id, sensor_id).await?),
    }
}

async fn handle_download_snapshot(
    client: &Client,
    device_id: &str,
    sensor_id: &str,
    image_id: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let body = match &image_id {
        Some(image_id) => {
            client
                .snapshot_body_by_id(device_id, sensor_id, image_id)
                .await?
        }
        None => client.snapshot_body(device_id, sensor_id).await?,
    };

    let output = match output {
        Some(output) => output,
        None => {
            let stem = image_id.unwrap_or_else(|| format!("{}-{}", device_id, sensor_id));
            match infer::get(&body) {
                Some(kind) => PathBuf::from(format!("{}.{}", stem, kind.extension())),
                None => PathBuf::from(stem),
            }
        }
    };

    tokio::fs::write(&output, &body).await?;
    println!("Saved {} bytes to {:?}", body.len(), output);
    Ok(())
}

async fn handle_sheets(client: &Client, device_id: &str) -> Result<(), Error> {
    for sheet in client.sheets(device_id).await? {
        println!("{}", sheet);
    }
    Ok(())
}

async fn handle_declare_sheet(
    client: &Client,
    device_id: &str,
    path: PathBuf,
) -> Result<(), Error> {
    let definition = tokio::fs::read(&path).await?;
    let sheet: Sheet = serde_json::from_slice(&definition).map_err(Error::Decoding)?;
    let sheet = client.declare_sheet(device_id, &sheet).await?;
    println!("Declared sheet {}", sheet);
    Ok(())
}

async fn handle_save_record(
    client: &Client,
    device_id: &str,
    sheet_id: String,
    fields: Vec<(String, String)>,
    time: Option<String>,
) -> Result<(), Error> {
    let mut record = Record::new(sheet_id, fields.into_iter().collect::<HashMap<_, _>>());
    record.time = time;
    client.save_record(device_id, &record).await
}

async fn handle_records(
    client: &Client,
    device_id: &str,
    sheet_id: &str,
    range: Option<RangeQuery>,
) -> Result<(), Error> {
    match range {
        Some(range) => print_json(&client.records(device_id, sheet_id, &range).await?),
        None => print_json(&client.record(device_id, sheet_id).await?),
    }
}

#[cfg(feature = "profiling")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    init_tracing();

    let args = Args::parse();

    // Commands that don't need a server
    if args.cmd == Command::Now {
        println!("{}", now());
        return Ok(());
    }

    let client = Client::new(client_config(&args)?)?;
    debug!("Using {:?}", client);

    match args.cmd {
        Command::Now => unreachable!(),
        Command::Devices => handle_devices(&client).await,
        Command::Device { device_id } => print_json(&client.device(&device_id).await?),
        Command::CreateDevice {
            name,
            desc,
            kind,
            uri,
            lat,
            lon,
        } => {
            let location = lat.zip(lon);
            handle_create_device(&client, name, desc, kind, uri, location).await
        }
        Command::ModifyDevice {
            device_id,
            name,
            desc,
            kind,
            uri,
            lat,
            lon,
        } => {
            let mut changes = Device::default();
            changes.name = name;
            changes.desc = desc;
            changes.kind = kind;
            changes.uri = uri;
            changes.lat = lat;
            changes.lon = lon;
            handle_modify_device(&client, &device_id, changes).await
        }
        Command::DeleteDevice { device_id } => client.delete_device(&device_id).await,
        Command::Sensors { device_id } => handle_sensors(&client, &device_id).await,
        Command::Sensor {
            device_id,
            sensor_id,
        } => print_json(&client.sensor(&device_id, &sensor_id).await?),
        Command::CreateSensor {
            device_id,
            sensor_id,
            name,
            desc,
            kind,
            unit,
        } => {
            let mut sensor = Sensor::new(sensor_id);
            sensor.name = name;
            sensor.desc = desc;
            sensor.kind = kind;
            sensor.unit = unit;
            handle_create_sensor(&client, &device_id, sensor).await
        }
        Command::ModifySensor {
            device_id,
            sensor_id,
            name,
            desc,
            kind,
            unit,
        } => {
            let mut changes = Sensor::new(sensor_id.clone());
            changes.name = name;
            changes.desc = desc;
            changes.kind = kind;
            changes.unit = unit;
            handle_modify_sensor(&client, &device_id, &sensor_id, changes).await
        }
        Command::DeleteSensor {
            device_id,
            sensor_id,
        } => client.delete_sensor(&device_id, &sensor_id).await,
        Command::SaveRawdata {
            device_id,
            sensor_id,
            values,
            time,
            lat,
            lon,
        } => {
            let mut sample = Rawdata::new(sensor_id, values);
            sample.time = time;
            sample.lat = lat;
            sample.lon = lon;
            client.save_rawdata(&device_id, &sample).await
        }
        Command::Rawdata {
            device_id,
            sensor_id,
            start,
            end,
            interval,
        } => handle_rawdata(&client, &device_id, &sensor_id, range(start, end, interval)).await,
        Command::DeleteRawdata {
            device_id,
            sensor_id,
            start,
            end,
        } => {
            let range = range(start, end, None).unwrap_or_default();
            client.delete_rawdata(&device_id, &sensor_id, &range).await
        }
        Command::UploadSnapshot {
            device_id,
            sensor_id,
            path,
            values,
            name,
            content_type,
            time,
            lat,
            lon,
        } => {
            let mut sample = Rawdata::new(sensor_id, values);
            sample.time = time;
            sample.lat = lat;
            sample.lon = lon;
            handle_upload_snapshot(&client, &device_id, sample, path, name, content_type).await
        }
        Command::SnapshotMeta {
            device_id,
            sensor_id,
            start,
            end,
        } => handle_snapshot_meta(&client, &device_id, &sensor_id, range(start, end, None)).await,
        Command::DownloadSnapshot {
            device_id,
            sensor_id,
            image_id,
            output,
        } => handle_download_snapshot(&client, &device_id, &sensor_id, image_id, output).await,
        Command::DeleteSnapshot {
            device_id,
            sensor_id,
            start,
            end,
        } => {
            let range = range(start, end, None).unwrap_or_default();
            client.delete_snapshot(&device_id, &sensor_id, &range).await
        }
        Command::Sheets { device_id } => handle_sheets(&client, &device_id).await,
        Command::Sheet {
            device_id,
            sheet_id,
        } => print_json(&client.sheet(&device_id, &sheet_id).await?),
        Command::DeclareSheet { device_id, path } => {
            handle_declare_sheet(&client, &device_id, path).await
        }
        Command::DeleteSheet {
            device_id,
            sheet_id,
        } => client.delete_sheet(&device_id, &sheet_id).await,
        Command::SaveRecord {
            device_id,
            sheet_id,
            fields,
            time,
        } => handle_save_record(&client, &device_id, sheet_id, fields, time).await,
        Command::Records {
            device_id,
            sheet_id,
            start,
            end,
            interval,
        } => handle_records(&client, &device_id, &sheet_id, range(start, end, interval)).await,
        Command::DeleteRecords {
            device_id,
            sheet_id,
            start,
            end,
        } => {
            let range = range(start, end, None).unwrap_or_default();
            client.delete_records(&device_id, &sheet_id, &range).await
        }
        Command::Reconfigure { serial_id, digest } => {
            client.reconfigure(&serial_id, &digest).await
        }
        Command::SetDeviceId {
            serial_id,
            digest,
            device_id,
        } => client.set_device_id(&serial_id, &digest, &device_id).await,
    }
}
