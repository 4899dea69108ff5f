//! Built-in listing categories.
//!
//! Each category is a data table: field declarations, the required set in
//! the order the form checks it, and the coercions applied at submission.

use crate::model::schema::{CategorySchema, Fallback, FieldSpec};

const PRICE_RANGES: &[&str] = &["$", "$$", "$$$"];
const DAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const GENDERS: &[&str] = &["Unisex", "Women", "Men"];
const VEHICLE_TYPES: &[&str] = &["Car", "Van", "Tuk", "Bike"];
const TEACHING_MODES: &[&str] = &["Online", "Physical", "Both"];

pub static RESTAURANT: CategorySchema = CategorySchema {
    key: "restaurant",
    label: "Restaurant",
    endpoint: "restaurants",
    fields: &[
        FieldSpec::text("name", "Restaurant name").required(),
        FieldSpec::text("description", "Description"),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::text("contactInfo.website", "Website"),
        FieldSpec::text("openingHours", "Opening hours"),
        FieldSpec::choice("priceRange", "Price range", PRICE_RANGES),
        FieldSpec::tags("cuisineTypes", "Cuisine types"),
        FieldSpec::yes_no("delivery", "Delivery"),
        FieldSpec::yes_no("takeaway", "Takeaway"),
        FieldSpec::yes_no("dineIn", "Dine-in"),
        FieldSpec::integer("seatingCapacity", "Seating capacity", Fallback::Null),
        FieldSpec::images(),
    ],
};

pub static PHARMACY: CategorySchema = CategorySchema {
    key: "pharmacy",
    label: "Pharmacy",
    endpoint: "pharmacies",
    fields: &[
        FieldSpec::text("name", "Pharmacy name").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("openingHours", "Opening hours"),
        FieldSpec::yes_no("service247", "24/7 service"),
        FieldSpec::yes_no("deliveryAvailable", "Delivery available"),
        FieldSpec::text("description", "Description"),
        FieldSpec::images(),
    ],
};

pub static HOSPITAL: CategorySchema = CategorySchema {
    key: "hospital",
    label: "Hospital",
    endpoint: "hospitals",
    fields: &[
        FieldSpec::text("name", "Hospital name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::text("contactInfo.emergency", "Emergency hotline"),
        FieldSpec::choice("type", "Hospital type", &["Government", "Private"]).required(),
        FieldSpec::tags("specialties", "Specialties"),
        FieldSpec::yes_no("emergencyService", "Emergency service"),
        FieldSpec::yes_no("ambulanceService", "Ambulance service"),
        FieldSpec::integer("beds", "Number of beds", Fallback::Zero),
        FieldSpec::slots("doctorAvailability", "Doctor availability"),
        FieldSpec::images(),
    ],
};

pub static SALON: CategorySchema = CategorySchema {
    key: "salon",
    label: "Beauty Salon",
    endpoint: "salons",
    fields: &[
        FieldSpec::text("name", "Salon name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::choice("gender", "Serves", GENDERS),
        FieldSpec::tags("services", "Services"),
        FieldSpec::float("priceFrom", "Starting price", Fallback::Zero),
        FieldSpec::yes_no("appointmentRequired", "Appointment required"),
        FieldSpec::slots("availability", "Availability"),
        FieldSpec::images(),
    ],
};

pub static GYM: CategorySchema = CategorySchema {
    key: "gym",
    label: "Gym",
    endpoint: "gyms",
    fields: &[
        FieldSpec::text("name", "Gym name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::text("openingHours", "Opening hours"),
        FieldSpec::tags("facilities", "Facilities"),
        FieldSpec::tags("classes", "Classes"),
        FieldSpec::float("monthlyFee", "Monthly fee", Fallback::Zero),
        FieldSpec::yes_no("personalTraining", "Personal training"),
        FieldSpec::choice("gender", "Serves", GENDERS),
        FieldSpec::images(),
    ],
};

pub static HOTEL: CategorySchema = CategorySchema {
    key: "hotel",
    label: "Hotel",
    endpoint: "hotels",
    fields: &[
        FieldSpec::text("name", "Hotel name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::text("contactInfo.website", "Website"),
        FieldSpec::integer("starRating", "Star rating", Fallback::Null),
        FieldSpec::integer("rooms", "Number of rooms", Fallback::Zero),
        FieldSpec::float("pricePerNight", "Price per night", Fallback::Null),
        FieldSpec::tags("amenities", "Amenities"),
        FieldSpec::yes_no("pool", "Swimming pool"),
        FieldSpec::yes_no("parking", "Parking"),
        FieldSpec::images(),
    ],
};

pub static SUPERMARKET: CategorySchema = CategorySchema {
    key: "supermarket",
    label: "Supermarket",
    endpoint: "supermarkets",
    fields: &[
        FieldSpec::text("name", "Supermarket name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("openingHours", "Opening hours"),
        FieldSpec::yes_no("deliveryAvailable", "Delivery available"),
        FieldSpec::yes_no("parking", "Parking"),
        FieldSpec::tags("sections", "Sections"),
        FieldSpec::images(),
    ],
};

pub static BAKERY: CategorySchema = CategorySchema {
    key: "bakery",
    label: "Bakery",
    endpoint: "bakeries",
    fields: &[
        FieldSpec::text("name", "Bakery name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("openingHours", "Opening hours"),
        FieldSpec::tags("specialties", "Specialties"),
        FieldSpec::yes_no("customOrders", "Custom orders"),
        FieldSpec::yes_no("deliveryAvailable", "Delivery available"),
        FieldSpec::images(),
    ],
};

pub static GARAGE: CategorySchema = CategorySchema {
    key: "garage",
    label: "Vehicle Repair",
    endpoint: "garages",
    fields: &[
        FieldSpec::text("name", "Garage name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::tags("services", "Services"),
        FieldSpec::tags("vehicleTypes", "Vehicle types"),
        FieldSpec::yes_no("towingService", "Towing service"),
        FieldSpec::yes_no("service247", "24/7 service"),
        FieldSpec::images(),
    ],
};

pub static LAUNDRY: CategorySchema = CategorySchema {
    key: "laundry",
    label: "Laundry",
    endpoint: "laundries",
    fields: &[
        FieldSpec::text("name", "Laundry name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::tags("services", "Services"),
        FieldSpec::float("pricePerKg", "Price per kg", Fallback::Zero),
        FieldSpec::yes_no("pickupDelivery", "Pickup and delivery"),
        FieldSpec::integer("turnaroundHours", "Turnaround (hours)", Fallback::Null),
        FieldSpec::images(),
    ],
};

pub static TUTOR: CategorySchema = CategorySchema {
    key: "tutor",
    label: "Tutor",
    endpoint: "tutors",
    fields: &[
        FieldSpec::text("name", "Tutor name").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::tags("subjects", "Subjects"),
        FieldSpec::choice("mode", "Teaching mode", TEACHING_MODES),
        FieldSpec::float("hourlyRate", "Hourly rate", Fallback::Zero),
        FieldSpec::integer("experienceYears", "Years of experience", Fallback::Zero),
        FieldSpec::slots("availability", "Availability"),
        FieldSpec::images(),
    ],
};

pub static TAXI: CategorySchema = CategorySchema {
    key: "taxi",
    label: "Taxi",
    endpoint: "taxis",
    fields: &[
        FieldSpec::text("name", "Driver or company name").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("location", "Base location").required(),
        FieldSpec::choice("vehicleType", "Vehicle type", VEHICLE_TYPES).required(),
        FieldSpec::integer("seats", "Seats", Fallback::Null),
        FieldSpec::float("ratePerKm", "Rate per km", Fallback::Zero),
        FieldSpec::yes_no("airConditioned", "Air conditioned"),
        FieldSpec::yes_no("service247", "24/7 service"),
        FieldSpec::images(),
    ],
};

pub static PLUMBER: CategorySchema = CategorySchema {
    key: "plumber",
    label: "Plumber",
    endpoint: "plumbers",
    fields: &[
        FieldSpec::text("name", "Name").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("location", "Service area").required(),
        FieldSpec::tags("services", "Services"),
        FieldSpec::integer("experienceYears", "Years of experience", Fallback::Zero),
        FieldSpec::yes_no("emergencyService", "Emergency service"),
        FieldSpec::slots("availability", "Availability"),
        FieldSpec::images(),
    ],
};

pub static ELECTRICIAN: CategorySchema = CategorySchema {
    key: "electrician",
    label: "Electrician",
    endpoint: "electricians",
    fields: &[
        FieldSpec::text("name", "Name").required(),
        FieldSpec::text("contactNo", "Contact number").required(),
        FieldSpec::text("location", "Service area").required(),
        FieldSpec::tags("services", "Services"),
        FieldSpec::integer("experienceYears", "Years of experience", Fallback::Zero),
        FieldSpec::yes_no("certified", "Certified"),
        FieldSpec::yes_no("emergencyService", "Emergency service"),
        FieldSpec::slots("availability", "Availability"),
        FieldSpec::images(),
    ],
};

pub static PET_CARE: CategorySchema = CategorySchema {
    key: "pet-care",
    label: "Pet Care",
    endpoint: "pet-cares",
    fields: &[
        FieldSpec::text("name", "Name").required(),
        FieldSpec::text("location", "Location").required(),
        FieldSpec::text("contactInfo.phone", "Phone number").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::tags("services", "Services"),
        FieldSpec::tags("petTypes", "Pet types"),
        FieldSpec::yes_no("veterinarian", "Veterinarian on site"),
        FieldSpec::yes_no("boarding", "Boarding"),
        FieldSpec::choice("openDay", "Open from", DAYS),
        FieldSpec::images(),
    ],
};

/// All built-in categories in display order.
pub static ALL: &[&CategorySchema] = &[
    &RESTAURANT,
    &PHARMACY,
    &HOSPITAL,
    &SALON,
    &GYM,
    &HOTEL,
    &SUPERMARKET,
    &BAKERY,
    &GARAGE,
    &LAUNDRY,
    &TUTOR,
    &TAXI,
    &PLUMBER,
    &ELECTRICIAN,
    &PET_CARE,
];

/// Look up a category by key or (case-insensitive) label.
pub fn find(name: &str) -> Option<&'static CategorySchema> {
    ALL.iter().copied().find(|c| {
        c.key.eq_ignore_ascii_case(name) || c.label.eq_ignore_ascii_case(name)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::schema::{FieldKind, IMAGES_FIELD};

    #[test]
    fn test_every_category_has_images_and_unique_paths() {
        for category in ALL {
            let mut seen = HashSet::new();
            for field in category.fields {
                assert!(
                    seen.insert(field.path),
                    "{}: duplicate path {}",
                    category.key,
                    field.path
                );
            }
            let images = category.field(IMAGES_FIELD).unwrap();
            assert_eq!(images.kind, FieldKind::Images, "{}", category.key);
        }
    }

    #[test]
    fn test_every_category_requires_a_name_first() {
        for category in ALL {
            assert_eq!(category.required_spec().first(), Some(&"name"), "{}", category.key);
        }
    }

    #[test]
    fn test_find_by_key_or_label() {
        assert_eq!(find("pharmacy").unwrap().key, "pharmacy");
        assert_eq!(find("Beauty Salon").unwrap().key, "salon");
        assert_eq!(find("PET-CARE").unwrap().key, "pet-care");
        assert!(find("bank").is_none());
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = ALL.iter().map(|c| c.key).collect();
        assert_eq!(keys.len(), ALL.len());
        assert_eq!(ALL.len(), 15);
    }
}
