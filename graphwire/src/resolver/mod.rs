//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Class and reference resolution.
//!
//! - [`ClassResolver`] maps classes to compact wire identities and back.
//! - [`ReferenceResolver`] tracks object identity inside one session so that
//!   shared objects are written once and cycles terminate.

mod class;
mod reference;

pub use class::{
    ClassNames, ClassResolver, MAX_REGISTRATION_ID, NAME, NULL, Registration, RegistrationId,
};
pub use reference::{
    ListReferenceResolver, MapReferenceResolver, ReferenceResolver, use_references_by_default,
};
