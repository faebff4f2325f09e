fn main() {
    clinic_desk_lib::run()
}
