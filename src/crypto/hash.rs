// minidkim – implementation of the DKIM specification
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

use crate::crypto::HashAlgorithm;
use ::digest::DynDigest;
use sha1::Sha1;
use sha2::Sha256;

fn new_hasher(hash_alg: HashAlgorithm) -> Box<dyn DynDigest> {
    match hash_alg {
        HashAlgorithm::Sha1 => Box::new(Sha1::default()),
        HashAlgorithm::Sha256 => Box::new(Sha256::default()),
    }
}

/// Computes the message digest of the concatenation of the given slices.
pub fn digest_slices<I, T>(hash_alg: HashAlgorithm, slices: I) -> Box<[u8]>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = new_hasher(hash_alg);
    for bytes in slices {
        hasher.update(bytes.as_ref());
    }
    hasher.finalize()
}

pub fn digest(hash_alg: HashAlgorithm, bytes: &[u8]) -> Box<[u8]> {
    digest_slices(hash_alg, [bytes])
}
