use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("unknown numeric type: {name:?}"))]
    UnknownNumericType { name: String },

    #[snafu(display("unknown backend: {name:?}; expected \"opencl\" or \"hip\""))]
    UnknownBackend { name: String },
}
