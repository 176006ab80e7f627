use chrono::{DateTime, Local, TimeZone};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);
pub const URGENCY_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Clock,
    Urgency,
}

/// Repeating timers feeding the event loop. Dropping the handle stops them.
pub struct PeriodicTasks {
    handles: Vec<JoinHandle<()>>,
}

impl PeriodicTasks {
    pub fn spawn<M>(tx: UnboundedSender<M>) -> Self
    where
        M: From<Tick> + Send + 'static,
    {
        let handles = vec![
            spawn_ticker(tx.clone(), Tick::Clock, CLOCK_PERIOD),
            spawn_ticker(tx, Tick::Urgency, URGENCY_PERIOD),
        ];
        PeriodicTasks { handles }
    }

    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PeriodicTasks {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_ticker<M>(tx: UnboundedSender<M>, tick: Tick, period: Duration) -> JoinHandle<()>
where
    M: From<Tick> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so ticks start one
        // period in.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(M::from(tick)).is_err() {
                break;
            }
        }
    })
}

pub fn clock_label<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M:%S").to_string()
}

pub fn local_clock_label() -> String {
    clock_label(&Local::now())
}
