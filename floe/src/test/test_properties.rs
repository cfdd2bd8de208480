// Floe: Orchestration for a Parallel Discrete-Event Network Simulator
// Copyright (C) 2026  The Floe Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::properties::{ElementType, Property, PropertyBag};

#[test]
fn scalar_accessors_do_not_coerce() {
    let mut bag = PropertyBag::new("params");
    bag.insert("count", Property::Int(42));
    bag.insert("rate", Property::Double(2.5));
    bag.insert("label", Property::Str("fast".to_string()));
    bag.insert("enabled", Property::Bool(true));

    assert_eq!(bag.get_int("count"), Some(42));
    assert_eq!(bag.get_double("rate"), Some(2.5));
    assert_eq!(bag.get_str("label"), Some("fast"));
    assert_eq!(bag.get_bool("enabled"), Some(true));

    // wrong-typed lookups return nothing instead of coercing
    assert_eq!(bag.get_double("count"), None);
    assert_eq!(bag.get_int("rate"), None);
    assert_eq!(bag.get_bool("label"), None);
    assert_eq!(bag.get_str("missing"), None);
}

#[test]
fn element_type_and_len() {
    assert_eq!(Property::Int(1).element_type(), ElementType::Int);
    assert_eq!(Property::Int(1).len(), 1);
    assert!(!Property::Int(1).is_vector());

    let v = Property::DoubleVec(vec![1.0, 2.0, 3.0]);
    assert_eq!(v.element_type(), ElementType::Double);
    assert_eq!(v.len(), 3);
    assert!(v.is_vector());
    assert_eq!(v.double_at(2), Some(3.0));
    assert_eq!(v.double_at(3), None);
    assert_eq!(v.int_at(0), None);
}

#[test]
fn indexed_update() {
    let mut v = Property::IntVec(vec![1, 2, 3]);
    v.set_int_at(1, 20);
    assert_eq!(v.int_at(1), Some(20));
}

#[test]
#[should_panic]
fn indexed_update_out_of_range_panics() {
    let mut v = Property::IntVec(vec![1, 2, 3]);
    v.set_int_at(3, 0);
}

#[test]
#[should_panic]
fn indexed_update_wrong_type_panics() {
    let mut v = Property::DoubleVec(vec![1.0]);
    v.set_int_at(0, 1);
}

#[test]
fn insert_replaces() {
    let mut bag = PropertyBag::new("params");
    assert_eq!(bag.insert("k", Property::Int(1)), None);
    assert_eq!(bag.insert("k", Property::Int(2)), Some(Property::Int(1)));
    assert_eq!(bag.get_int("k"), Some(2));
    assert_eq!(bag.len(), 1);
    assert_eq!(bag.name(), "params");
}
