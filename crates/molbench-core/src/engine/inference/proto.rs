//! Messages and client stub of the `nvidia.cheminformatics.grpc` generative sampler
//! protocol, generated from `proto/generativesampler.proto`.

use std::fmt;
use std::str::FromStr;

tonic::include_proto!("nvidia.cheminformatics.grpc");

impl fmt::Display for GenerativeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_name())
    }
}

impl FromStr for GenerativeModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cddd" => Ok(GenerativeModel::Cddd),
            "molbart" => Ok(GenerativeModel::MolBart),
            "megamolbart" => Ok(GenerativeModel::MegaMolBart),
            _ => Err(format!("unknown generative model '{}'", s)),
        }
    }
}
