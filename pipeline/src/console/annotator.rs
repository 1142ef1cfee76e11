use infracore::arrival::port::{AnnotationPort, AnnotationRequest, MarkedPoint};
use infracore::arrival::session::RAW_TRACE_LABEL;
use infracore::math::stats::StatsHelper;
use std::io::{BufRead, Write};

/// Terminal surface for marking arrivals.
///
/// Each request prints a per-trace summary and waits for one line of the form
/// `<time> <amplitude> [trace]`. A time starting with `+` is taken relative to the
/// first sample. A blank line, `skip`, `q` or end of input aborts the station.
pub struct ConsoleAnnotator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleAnnotator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn describe(&mut self, request: &AnnotationRequest<'_>) -> std::io::Result<()> {
        let first = request.times.first().copied().unwrap_or_default();
        let last = request.times.last().copied().unwrap_or_default();
        writeln!(
            self.output,
            "station {:03}  {:.1} km  {} samples  t=[{:.3}, {:.3}]",
            request.station,
            request.distance / 1000.0,
            request.times.len(),
            first,
            last
        )?;
        for trace in request.traces {
            let peak_at = StatsHelper::argmax_abs(trace.samples)
                .and_then(|idx| request.times.get(idx))
                .map(|t| t - first)
                .unwrap_or_default();
            writeln!(
                self.output,
                "  {:<9} peak {:>10.4} at +{:<10.2} rms {:.4}",
                trace.label,
                StatsHelper::peak_abs(trace.samples),
                peak_at,
                StatsHelper::rms(trace.samples)
            )?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> std::io::Result<()> {
        write!(self.output, "mark <time|+offset> <amplitude> [trace] (blank to skip): ")?;
        self.output.flush()
    }
}

/// Parses one answer line; `Ok(None)` means the analyst skipped the station.
fn parse_answer(line: &str, origin: f64) -> Result<Option<MarkedPoint>, String> {
    let mut fields = line.split_whitespace();
    let Some(time_field) = fields.next() else {
        return Ok(None);
    };
    if matches!(time_field, "q" | "quit" | "skip") {
        return Ok(None);
    }

    let time = match time_field.strip_prefix('+') {
        Some(offset) => origin + parse_number(offset, "time offset")?,
        None => parse_number(time_field, "time")?,
    };
    let amplitude = parse_number(
        fields.next().ok_or_else(|| "missing amplitude".to_string())?,
        "amplitude",
    )?;
    let trace = fields.next().unwrap_or(RAW_TRACE_LABEL).to_string();
    if let Some(extra) = fields.next() {
        return Err(format!("unexpected field {:?}", extra));
    }

    Ok(Some(MarkedPoint {
        time,
        amplitude,
        trace,
    }))
}

fn parse_number(field: &str, what: &str) -> Result<f64, String> {
    field
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("{} {:?} is not a number", what, field))
}

impl<R: BufRead, W: Write> AnnotationPort for ConsoleAnnotator<R, W> {
    fn request_annotation(&mut self, request: &AnnotationRequest<'_>) -> Option<MarkedPoint> {
        self.describe(request).ok()?;
        let origin = request.times.first().copied().unwrap_or_default();
        loop {
            self.prompt().ok()?;
            let mut line = String::new();
            if self.input.read_line(&mut line).ok()? == 0 {
                return None;
            }
            match parse_answer(&line, origin) {
                Ok(answer) => return answer,
                Err(message) => writeln!(self.output, "  {}", message).ok()?,
            }
        }
    }
}
