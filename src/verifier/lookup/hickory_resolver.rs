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

use super::LookupTxt;
use hickory_resolver::{error::ResolveErrorKind, Name, Resolver};
use std::io::{self, ErrorKind};

impl LookupTxt for Resolver {
    fn lookup_txt(&self, domain: &str) -> io::Result<Option<String>> {
        let name = Name::from_ascii(domain).map_err(|_| io::Error::from(ErrorKind::InvalidInput))?;

        let lookup = match self.txt_lookup(name) {
            Ok(lookup) => lookup,
            Err(e) => {
                return match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => Ok(None),
                    _ => Err(e.into()),
                };
            }
        };

        // §3.6.2.2: ‘TXT RRs MUST be unique for a particular selector name’,
        // only the first record is used
        let txt = match lookup.iter().next() {
            Some(txt) => txt.txt_data().concat(),
            None => return Ok(None),
        };

        String::from_utf8(txt)
            .map(Some)
            .map_err(|_| ErrorKind::InvalidData.into())
    }
}
