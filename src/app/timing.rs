use std::time::{Duration, Instant};
use winit::window::Window;

const TITLE_INTERVAL: Duration = Duration::from_millis(500);

/// Frame delta, animation clock and the fps readout in the window title.
pub struct FrameTiming {
    started: Instant,
    last_frame_time: Option<Instant>,
    last_title_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_frame_time: None,
            last_title_time: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Seconds since start-up.
    pub fn elapsed(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.started).as_secs_f32()
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        // long stalls (dialogs, window drags) should not teleport animations
        self.frame_dt = dt.as_secs_f32().min(0.25);

        self.frame_count = self.frame_count.saturating_add(1);
        let since_title = now.saturating_duration_since(self.last_title_time);
        if since_title >= TITLE_INTERVAL {
            let fps = self.frame_count as f32 / since_title.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&self.title(fps));
            }
            self.frame_count = 0;
            self.last_title_time = now;
        }
    }

    fn title(&self, fps: f32) -> String {
        format!(
            "{} - {:.1} fps (render {:.2} ms)",
            self.base_title, fps, self.render_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_delta_is_clamped_after_stalls() {
        let mut timing = FrameTiming::new("modelview".to_string());
        let start = Instant::now();
        timing.update(None, start);
        timing.update(None, start + Duration::from_millis(20));
        assert!((timing.frame_dt - 0.02).abs() < 1e-4);
        timing.update(None, start + Duration::from_secs(3));
        assert_eq!(timing.frame_dt, 0.25);
    }

    #[test]
    fn title_reports_fps_and_render_time() {
        let mut timing = FrameTiming::new("modelview".to_string());
        timing.set_render_ms(1.5);
        assert_eq!(timing.title(60.0), "modelview - 60.0 fps (render 1.50 ms)");
        assert!(timing.elapsed(Instant::now()) >= 0.0);
    }
}
