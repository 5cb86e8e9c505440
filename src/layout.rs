use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

/// Holds at most one pending job. Scheduling a new one drops the old handle,
/// which for a `gloo_timers` `Timeout` cancels it.
#[derive(Debug)]
pub struct Coalescer<H> {
    pending: Option<H>,
    generation: u64,
    settled: u64,
}

impl<H> Default for Coalescer<H> {
    fn default() -> Self {
        Self {
            pending: None,
            generation: 0,
            settled: 0,
        }
    }
}

impl<H> Coalescer<H> {
    /// Replaces any pending job with the one built by `make`, which receives
    /// the generation to pass back to [`Coalescer::settle`].
    pub fn schedule(&mut self, make: impl FnOnce(u64) -> H) -> u64 {
        self.generation += 1;
        self.pending = Some(make(self.generation));
        self.generation
    }

    /// Marks `generation` as run. Returns false for a superseded job.
    pub fn settle(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.settled == generation {
            return false;
        }
        self.settled = generation;
        true
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending.is_some() && self.settled != self.generation
    }
}

/// Gives every row in `selector` the height of the tallest one.
pub fn sync_row_heights(selector: &str) -> usize {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return 0;
    };
    let Ok(rows) = document.query_selector_all(selector) else {
        return 0;
    };

    let elements: Vec<HtmlElement> = (0..rows.length())
        .filter_map(|index| rows.item(index))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect();

    for element in &elements {
        let _ = element.style().remove_property("height");
    }
    let tallest = elements
        .iter()
        .map(|element| element.offset_height())
        .max()
        .unwrap_or(0);
    for element in &elements {
        let _ = element
            .style()
            .set_property("height", &format!("{tallest}px"));
    }

    elements.len()
}
