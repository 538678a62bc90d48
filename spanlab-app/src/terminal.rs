use spanlab_core::{
    Arrangement, Card, EngineWarning, PresentationObserver, PresentationPhase, StimulusView,
    Transition,
};
use std::io::{self, Write};
use tracing::warn;

const CLEAR_LINE: &str = "\r\x1b[2K";

/// Draws engine transitions on a terminal.
pub struct TerminalObserver<W: Write> {
    out: W,
}

impl<W: Write> TerminalObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, t: &Transition) -> io::Result<()> {
        match (t.phase, &t.stimulus) {
            (PresentationPhase::Presenting, Some(StimulusView::Token(token))) => {
                write!(self.out, "{CLEAR_LINE}        {token}")?;
            }
            (PresentationPhase::Presenting, Some(StimulusView::Arrangement(arr))) => {
                writeln!(self.out, "Memorize the arrangement:")?;
                self.arrangement(arr)?;
                if let Some(ms) = t.remaining_ms {
                    write!(self.out, "{}s left", ms.div_ceil(1000))?;
                }
            }
            (PresentationPhase::Presenting, None) => {
                if let Some(ms) = t.remaining_ms {
                    write!(self.out, "{CLEAR_LINE}{}s left", ms.div_ceil(1000))?;
                    if t.early_exit_available {
                        write!(self.out, ", press Enter when ready")?;
                    }
                }
            }
            (PresentationPhase::Blank, _) => write!(self.out, "{CLEAR_LINE}")?,
            (PresentationPhase::AwaitingResponse, Some(StimulusView::Arrangement(arr))) => {
                writeln!(self.out, "{CLEAR_LINE}Now:")?;
                self.arrangement(arr)?;
            }
            (PresentationPhase::AwaitingResponse, Some(StimulusView::Cards(cards))) => {
                self.cards(cards)?;
            }
            (PresentationPhase::AwaitingResponse, _) => write!(self.out, "{CLEAR_LINE}")?,
            (PresentationPhase::Complete, _) => writeln!(self.out, "\nTask complete.")?,
            _ => {}
        }
        self.out.flush()
    }

    fn arrangement(&mut self, arr: &Arrangement) -> io::Result<()> {
        for (i, slot) in arr.slots().iter().enumerate() {
            write!(self.out, "  {}: {slot}", i + 1)?;
        }
        writeln!(self.out)
    }

    fn cards(&mut self, cards: &[Card]) -> io::Result<()> {
        for (i, card) in cards.iter().enumerate() {
            write!(self.out, "  [{}] {}", i + 1, card.label)?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> PresentationObserver for TerminalObserver<W> {
    fn on_transition(&mut self, transition: &Transition) {
        if let Err(err) = self.render(transition) {
            warn!(%err, "terminal write failed");
        }
    }

    fn on_warning(&mut self, warning: &EngineWarning) {
        if let Err(err) = writeln!(self.out, "\n(note: {warning})") {
            warn!(%err, "terminal write failed");
        }
    }
}
