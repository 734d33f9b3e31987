use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the database")]
    Database,
    #[display("could not set up the data source")]
    Source,
    #[display("service error")]
    Service,
    #[display("could not write output")]
    Output,
}
