/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::path::PathBuf;
use anyhow::{Result,anyhow};
use clap::Parser;
use tokio::{io::{AsyncBufReadExt,BufReader}, sync::mpsc};
use tracing_subscriber::EnvFilter;

use odin_flights::{
    load_flights_config, create_fetcher, describe, FlightsConfig, HeadlessDisplay, HandleId, PollScheduler,
    PollSchedulerHandle, Provider, UiEvent, DisplayUnits
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "poll live aircraft snapshots for a region and print the reconciled tracks")]
struct Args {
    /// RON config file (default: flights.ron lookup)
    #[arg(short,long)]
    config: Option<PathBuf>,

    /// region index or name to start with
    #[arg(short,long)]
    region: Option<String>,

    /// terminate after this number of reconciliations
    #[arg(long)]
    cycles: Option<usize>,

    /// use synthetic traffic instead of the configured provider
    #[arg(short,long)]
    simulate: bool,
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info"))) // RUST_LOG
        .init();

    let args = Args::parse();

    let mut config = load_flights_config( args.config.as_deref())?;
    if args.simulate {
        config.provider = Provider::Simulated { n_aircraft: 24, step: config.poll_interval };
    }
    let region_idx = match &args.region {
        Some(key) => config.region_index( key).ok_or_else( || anyhow!("unknown region {key}"))?,
        None => 0
    };

    let (tx_cycle, mut rx_cycle) = mpsc::channel::<usize>(16);
    let mut n_cycles = 0;

    let fetcher = create_fetcher( &config)?;
    let engine = config.create_engine( HeadlessDisplay::with_log_capacity(0))?;
    let scheduler = PollScheduler::new( &config, fetcher, engine)?
        .with_region( region_idx)?
        .on_reconciled( move |region, report, store| {
            println!("------------------ {}: {report}, {} tracks", region.name, store.len());
            n_cycles += 1;
            let _ = tx_cycle.try_send( n_cycles);
        });

    let (hscheduler, jh) = scheduler.spawn( 16);
    print_help( &config);

    let mut lines = BufReader::new( tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => if !exec_command( &hscheduler, &config, line.trim()).await? { break }
                None => { // stdin closed, keep polling until cycles are done or we get interrupted
                    if args.cycles.is_none() { tokio::signal::ctrl_c().await?; }
                    else { wait_for_cycles( &mut rx_cycle, args.cycles).await; }
                    break
                }
            },
            Some(n) = rx_cycle.recv() => {
                if args.cycles.map( |max| n >= max).unwrap_or(false) { break }
            }
            _ = tokio::signal::ctrl_c() => break
        }
    }

    hscheduler.terminate().await?;
    let scheduler = jh.await?;
    println!("terminated with {} tracks, {:?}", scheduler.store().len(), scheduler.stats());

    Ok(())
}

async fn wait_for_cycles (rx: &mut mpsc::Receiver<usize>, max: Option<usize>) {
    while let Some(n) = rx.recv().await {
        if max.map( |max| n >= max).unwrap_or(false) { break }
    }
}

fn print_help (config: &FlightsConfig) {
    println!("commands: region <idx|name>, refresh, list, click <handle>, quit");
    for (i,r) in config.regions.iter().enumerate() {
        println!("  region {i}: {}", r.name);
    }
}

/// returns false if we should quit
async fn exec_command (hscheduler: &PollSchedulerHandle, config: &FlightsConfig, line: &str)->Result<bool> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some("quit") | Some("q"), _) => return Ok(false),
        (Some("refresh"), _) => hscheduler.refresh().await?,
        (Some("region"), Some(key)) => match config.region_index( key) {
            Some(idx) => hscheduler.select_region( idx).await?,
            None => println!("unknown region {key}")
        }
        (Some("list"), _) => {
            let lines = hscheduler.query( |store| {
                store.sorted_ids().iter().filter_map( |id| store.get( id)).map( |t| t.to_string()).collect::<Vec<_>>()
            }).await?;
            for l in &lines { println!("{l}") }
            println!("{} tracks", lines.len());
        }
        (Some("click"), Some(h)) => match h.trim_start_matches('#').parse::<u64>() {
            Ok(h) => {
                let handle = HandleId(h);
                let units: DisplayUnits = config.display_units;
                hscheduler.ui_event( handle, UiEvent::Click).await?;
                match hscheduler.query( move |store| store.track_for_handle( handle).map( |t| describe( t, units))).await? {
                    Some(payload) => println!("{payload}"),
                    None => println!("no track for {handle}")
                }
            }
            Err(_) => println!("not a shape handle: {h}")
        }
        _ => print_help( config)
    }
    Ok(true)
}
