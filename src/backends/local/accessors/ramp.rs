// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use serde_json::json;

use crate::accessor::{Accessor, PortOptions, PortType};
use crate::backends::local::accessors::number;
use crate::config::consts::DEFAULT_RAMP_INTERVAL_MS;
use crate::traits::AccessorDefinition;

/// Spontaneous counter: sends `start`, `start + step`, ... every `interval_ms`.
///
/// Its output is declared spontaneous, so feeding the output back into an upstream
/// accessor does not form a causality loop.
pub struct Ramp;

impl Ramp {
    pub const CLASS: &'static str = "timers/Ramp";
}

impl AccessorDefinition for Ramp {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.output(
            "output",
            PortOptions::typed(PortType::Number).spontaneous(),
        )?;
        this.parameter("start", PortOptions::typed(PortType::Number).with_value(json!(0)))?;
        this.parameter("step", PortOptions::typed(PortType::Number).with_value(json!(1)))?;
        this.parameter(
            "interval_ms",
            PortOptions::typed(PortType::Int).with_value(json!(DEFAULT_RAMP_INTERVAL_MS)),
        )?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        let start = this.get_parameter("start")?.as_f64().unwrap_or(0.0);
        let step = this.get_parameter("step")?.as_f64().unwrap_or(1.0);
        let interval = this
            .get_parameter("interval_ms")?
            .as_u64()
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_RAMP_INTERVAL_MS);

        let mut next = start;
        this.set_interval(Duration::from_millis(interval), move |this: &Accessor| {
            let value = next;
            next += step;
            this.send("output", number(value))?;
            Ok(())
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::LibrarySourceProvider;
    use crate::backends::timers::ManualTimers;
    use crate::engine::Runtime;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_ramp_counts_until_wrapup() {
        let timers = Rc::new(ManualTimers::new());
        let mut runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
        let ramp = runtime.instantiate("ramp", Ramp::CLASS).unwrap();
        ramp.set_parameter("start", json!(10)).unwrap();
        ramp.set_parameter("step", json!(5)).unwrap();
        ramp.set_parameter("interval_ms", json!(100)).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        ramp.on(crate::accessor::EventKind::Output, move |event| {
            if let crate::accessor::AccessorEvent::Output { value, .. } = event {
                sink.borrow_mut().push(value.clone());
            }
        });

        ramp.initialize().unwrap();
        timers.advance(Duration::from_millis(350));
        ramp.wrapup().unwrap();
        timers.advance(Duration::from_millis(500));

        assert_eq!(*seen.borrow(), vec![json!(10), json!(15), json!(20)]);
    }
}
