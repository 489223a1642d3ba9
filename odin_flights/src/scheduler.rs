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

use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};
use futures::future::OptionFuture;
use tokio::{sync::{mpsc,oneshot}, task::JoinHandle, time::{Instant,MissedTickBehavior,interval,sleep_until}};
use tracing::{debug,info,warn};

use crate::{
    FlightsConfig,
    display::{DisplayAdapter,HandleId,MapView,UiEvent},
    errors::{FetchError,OdinFlightsError,Result,config_error,op_failed},
    fetch::SnapshotFetcher,
    inspect::InspectionSurface,
    reconcile::{ReconciliationEngine,ReconciliationReport},
    record::NormalizedEntityState,
    region::Region,
    store::TrackStore,
};

/// closure executed by the scheduler task on its current track store
pub type SnapshotAction = Box<dyn FnOnce(&TrackStore) + Send>;

/// hook executed after every successful reconciliation
pub type ReconciledAction = Box<dyn FnMut(&Region,&ReconciliationReport,&TrackStore) + Send>;

/// the messages a [`PollScheduler`] task processes
pub enum PollMsg {
    SelectRegion(usize),
    Refresh,
    Ui(HandleId,UiEvent),
    ExecSnapshot(SnapshotAction),
    Terminate,
}

impl fmt::Debug for PollMsg {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollMsg::SelectRegion(idx) => write!( f, "SelectRegion({idx})"),
            PollMsg::Refresh => write!( f, "Refresh"),
            PollMsg::Ui(handle,event) => write!( f, "Ui({handle},{event:?})"),
            PollMsg::ExecSnapshot(_) => write!( f, "ExecSnapshot"),
            PollMsg::Terminate => write!( f, "Terminate"),
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum TriggerSource {
    Timer,
    Region,
    Refresh,
    Retry,
}

#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct SchedulerStats {
    pub cycles_started: usize,
    pub cycles_completed: usize,
    pub cycles_failed: usize,
    pub triggers_dropped: usize,
}

type FetchFuture = Pin<Box<dyn Future<Output=(usize,std::result::Result<Vec<NormalizedEntityState>,FetchError>)> + Send>>;

/// runs fetch+reconcile cycles on a fixed cadence and on demand. All store mutation happens inside the
/// scheduler task, with at most one cycle in flight - triggers that arrive while a fetch is pending are dropped
pub struct PollScheduler<M,D> where M: MapView, D: DisplayAdapter {
    regions: Vec<Region>,
    region_idx: usize,
    poll_interval: Duration,
    max_retries: usize,
    retry_delay: Duration,

    fetcher: Arc<dyn SnapshotFetcher>,
    engine: ReconciliationEngine<M,D>,
    inspection: InspectionSurface,
    on_reconciled: Option<ReconciledAction>,

    retries_left: usize,
    stats: SchedulerStats,
}

impl<M,D> PollScheduler<M,D> where M: MapView, D: DisplayAdapter {
    pub fn new (config: &FlightsConfig, fetcher: Arc<dyn SnapshotFetcher>, mut engine: ReconciliationEngine<M,D>)->Result<Self> {
        let region = config.regions.first().ok_or_else( || config_error!("no regions configured"))?;
        engine.refit( &region.bbox);

        Ok( PollScheduler {
            regions: config.regions.clone(),
            region_idx: 0,
            poll_interval: config.poll_interval,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            fetcher,
            engine,
            inspection: InspectionSurface::new( config.inspection_timeout, config.display_units),
            on_reconciled: None,
            retries_left: config.max_retries,
            stats: SchedulerStats::default(),
        })
    }

    /// start with a region other than the first one
    pub fn with_region (mut self, idx: usize)->Result<Self> {
        let region = self.regions.get( idx).ok_or_else( || config_error!("no region with index {idx}"))?;
        self.engine.refit( &region.bbox);
        self.region_idx = idx;
        Ok(self)
    }

    pub fn on_reconciled<F> (mut self, action: F)->Self where F: FnMut(&Region,&ReconciliationReport,&TrackStore) + Send + 'static {
        self.on_reconciled = Some( Box::new( action));
        self
    }

    pub fn engine (&self)->&ReconciliationEngine<M,D> { &self.engine }
    pub fn store (&self)->&TrackStore { self.engine.store() }
    pub fn inspection (&self)->&InspectionSurface { &self.inspection }
    pub fn stats (&self)->&SchedulerStats { &self.stats }
    pub fn regions (&self)->&[Region] { &self.regions }
    pub fn region_index (&self)->usize { self.region_idx }
    pub fn current_region (&self)->Option<&Region> { self.regions.get( self.region_idx) }

    /// the task loop. Returns the scheduler once it receives `Terminate` or all handles are dropped
    pub async fn run (mut self, mut rx: mpsc::Receiver<PollMsg>)->Self {
        let mut timer = interval( self.poll_interval);
        timer.set_missed_tick_behavior( MissedTickBehavior::Skip);

        let mut in_flight: Option<FetchFuture> = None;
        let mut retry_at: Option<Instant> = None;

        // note the first timer tick completes immediately, which is our initial cycle
        loop {
            let dismiss_at = self.inspection.expires_at();

            tokio::select! {
                _ = timer.tick() => {
                    self.trigger( &mut in_flight, TriggerSource::Timer);
                }

                Some((idx,result)) = OptionFuture::from( in_flight.as_mut()) => {
                    in_flight = None;
                    self.complete_cycle( idx, result, &mut retry_at);
                }

                Some(_) = OptionFuture::from( retry_at.map( sleep_until)) => {
                    retry_at = None;
                    self.trigger( &mut in_flight, TriggerSource::Retry);
                }

                Some(_) = OptionFuture::from( dismiss_at.map( sleep_until)) => {
                    self.inspection.expire( self.engine.display_mut(), Instant::now());
                }

                msg = rx.recv() => match msg {
                    Some(PollMsg::Terminate) | None => break,
                    Some(msg) => self.handle_msg( msg, &mut in_flight)
                }
            }
        }

        info!("poll scheduler terminated after {} cycles", self.stats.cycles_started);
        self
    }

    fn handle_msg (&mut self, msg: PollMsg, in_flight: &mut Option<FetchFuture>) {
        match msg {
            PollMsg::SelectRegion(idx) => {
                if self.select_region( idx) {
                    self.trigger( in_flight, TriggerSource::Region);
                }
            }
            PollMsg::Refresh => {
                self.trigger( in_flight, TriggerSource::Refresh);
            }
            PollMsg::Ui(handle,event) => {
                let (store,display) = self.engine.parts_mut();
                if let Some(payload) = self.inspection.on_ui_event( store, display, handle, event, Instant::now()) {
                    debug!("inspecting {}: {}", handle, payload.label);
                }
            }
            PollMsg::ExecSnapshot(action) => {
                action( self.engine.store());
            }
            PollMsg::Terminate => {} // handled by run loop
        }
    }

    fn select_region (&mut self, idx: usize)->bool {
        let Some(region) = self.regions.get( idx) else {
            warn!("ignoring selection of unknown region {idx}");
            return false
        };

        info!("switching to region {}", region.name);
        self.engine.refit( &region.bbox);
        self.region_idx = idx;
        true
    }

    fn trigger (&mut self, in_flight: &mut Option<FetchFuture>, source: TriggerSource)->bool {
        if in_flight.is_some() {
            self.stats.triggers_dropped += 1;
            debug!("dropping {:?} trigger, cycle still in flight", source);
            return false
        }

        let idx = self.region_idx;
        let Some(region) = self.regions.get( idx).cloned() else { return false };
        let fetcher = self.fetcher.clone();

        debug!("starting {:?} cycle for {}", source, region.name);
        *in_flight = Some( Box::pin( async move {
            let result = fetcher.fetch( &region).await;
            (idx, result)
        }));
        self.stats.cycles_started += 1;
        true
    }

    fn complete_cycle (&mut self, idx: usize, result: std::result::Result<Vec<NormalizedEntityState>,FetchError>, retry_at: &mut Option<Instant>) {
        let region_name = self.regions.get( idx).map( |r| r.name.as_str()).unwrap_or("?");

        match result {
            Ok(batch) => {
                self.retries_left = self.max_retries;
                self.stats.cycles_completed += 1;

                let report = self.engine.reconcile( &batch);
                debug!("{region_name}: {report} ({} tracks)", self.engine.store().len());

                if let (Some(action), Some(region)) = (self.on_reconciled.as_mut(), self.regions.get( idx)) {
                    action( region, &report, self.engine.store());
                }
            }
            Err(e) => {
                // tracks stay as they are
                self.stats.cycles_failed += 1;
                warn!("{region_name}: fetch failed: {e}");

                if self.retries_left > 0 {
                    self.retries_left -= 1;
                    *retry_at = Some( Instant::now() + self.retry_delay);
                    debug!("retry in {:?} ({} retries left)", self.retry_delay, self.retries_left);
                }
            }
        }
    }
}

impl<M,D> PollScheduler<M,D> where M: MapView + Send + 'static, D: DisplayAdapter + Send + 'static {
    /// run the scheduler in its own task
    pub fn spawn (self, queue_len: usize)->(PollSchedulerHandle, JoinHandle<Self>) {
        let (tx,rx) = mpsc::channel( queue_len.max(1));
        let jh = tokio::spawn( self.run( rx));
        (PollSchedulerHandle { tx }, jh)
    }
}

/// cloneable front end of a running [`PollScheduler`]
#[derive(Debug,Clone)]
pub struct PollSchedulerHandle {
    tx: mpsc::Sender<PollMsg>,
}

impl PollSchedulerHandle {
    pub async fn send_msg (&self, msg: PollMsg)->Result<()> {
        self.tx.send( msg).await.map_err( |_| OdinFlightsError::SchedulerClosed)
    }

    /// for synchronous callers such as UI event callbacks
    pub fn try_send_msg (&self, msg: PollMsg)->Result<()> {
        self.tx.try_send( msg).map_err( |e| match e {
            mpsc::error::TrySendError::Full(msg) => op_failed!("queue full, dropped {:?}", msg),
            mpsc::error::TrySendError::Closed(_) => OdinFlightsError::SchedulerClosed,
        })
    }

    pub async fn select_region (&self, idx: usize)->Result<()> { self.send_msg( PollMsg::SelectRegion(idx)).await }
    pub async fn refresh (&self)->Result<()> { self.send_msg( PollMsg::Refresh).await }
    pub async fn ui_event (&self, handle: HandleId, event: UiEvent)->Result<()> { self.send_msg( PollMsg::Ui(handle,event)).await }
    pub async fn terminate (&self)->Result<()> { self.send_msg( PollMsg::Terminate).await }

    /// run `f` on the current track store inside the scheduler task and return its result
    pub async fn query<F,R> (&self, f: F)->Result<R> where F: FnOnce(&TrackStore)->R + Send + 'static, R: Send + 'static {
        let (tx,rx) = oneshot::channel();
        let action: SnapshotAction = Box::new( move |store| { let _ = tx.send( f(store)); });
        self.send_msg( PollMsg::ExecSnapshot(action)).await?;
        rx.await.map_err( |_| OdinFlightsError::SchedulerClosed)
    }
}
