use crate::envelope::Envelope;

#[derive(Debug)]
pub enum ReceivedEnvelope {
    Eof,
    Envelope(Envelope),
}
